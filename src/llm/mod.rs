//! Language model abstraction for the chat assistant.
//!
//! `provider` defines the backend-agnostic trait and types; `providers`
//! holds the Ollama implementation the assistant ships with.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
