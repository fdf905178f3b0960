//! Archi - Home Assistant over MQTT
//!
//! A terminal chat assistant whose hands are an MQTT device fleet: a
//! temperature sensor, an 8x8 matrix display, and two switchable devices.
//!
//! # Overview
//!
//! This crate wires three layers together:
//! - MQTT device bridge with a supervised event loop and reconnection
//! - Append-only CSV log of every temperature reading the bridge observes
//! - Chat session driving a local Ollama model through schema-validated tools
//!
//! The bridge is constructed once at startup, connected, and then shared
//! behind an `Arc` with every tool that needs it. Tools never open their own
//! broker connections.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use archi::bridge::{DeviceBridge, MqttBridge};
//! use archi::config::AssistantConfig;
//! use archi::llm::providers::OllamaProvider;
//! use archi::sensor_log::SensorCsvLog;
//! use archi::session::ChatSession;
//! use archi::tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AssistantConfig::load_from_env()?;
//!
//! let log = SensorCsvLog::new(&config.sensor_log_path);
//! let mut bridge = MqttBridge::new(&config, log);
//! bridge.connect().await?;
//! let bridge: Arc<dyn DeviceBridge> = Arc::new(bridge);
//!
//! let tools = ToolRegistry::with_builtins(Arc::clone(&bridge), &config.search_api_key)?;
//! let provider = OllamaProvider::from_settings(&config.llm)?;
//!
//! let mut session = ChatSession::new(Arc::new(provider), Arc::new(tools), &config.llm);
//! let answer = session.run_turn("What's the temperature inside?").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod sensor_log;
pub mod session;
pub mod testing;
pub mod tools;

// Re-export the types binaries and tests reach for most
pub use bridge::{ConnectionState, DeviceBridge, DeviceId, MqttBridge};
pub use config::*;
pub use error::{AssistantError, AssistantResult};
pub use llm::{CompletionRequest, CompletionResponse, LlmProvider};
pub use sensor_log::{SensorCsvLog, SensorReading};
pub use session::ChatSession;
pub use tools::{Tool, ToolDescription, ToolError, ToolRegistry};
