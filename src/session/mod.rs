//! Chat session layer: conversation state plus the model/tool loop.

pub mod manager;

pub use manager::ChatSession;
