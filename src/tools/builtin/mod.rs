//! Builtin tools: bridge-backed device control plus web search.
//!
//! Pure formatting and parsing helpers are kept separate from the I/O in
//! each tool so they can be tested without a broker or network.

pub mod device;
pub mod display;
pub mod temperature;
pub mod web_search;

pub use device::DeviceToggleTool;
pub use display::DisplayCharacterTool;
pub use temperature::CurrentTemperatureTool;
pub use web_search::WebSearchTool;
