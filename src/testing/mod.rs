//! Testing utilities and mock implementations
//!
//! Mocks for the device bridge, the LLM provider, and tools, so the chat
//! stack can be exercised without a broker or a model daemon.

pub mod mocks;

pub use mocks::*;
