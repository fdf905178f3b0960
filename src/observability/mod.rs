//! Observability for the assistant
//!
//! Structured logging with environment-driven level and format selection.

pub mod logging;

// Re-export for convenience
pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{session_span, tool_span};
