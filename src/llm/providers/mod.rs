//! Concrete `LlmProvider` implementations.

pub mod ollama;

pub use ollama::*;
