//! MQTT implementation of the device bridge
//!
//! This module provides a focused, decomposed MQTT bridge that separates
//! pure functions from I/O operations for better testability and
//! maintainability.
//!
//! # Architecture
//!
//! The module is split into four focused sub-modules:
//!
//! - [`connection`] - Pure connection state management and configuration
//! - [`inbound`] - Pure event routing plus the sensor-reading recorder
//! - [`health`] - Pure reconnection decision logic
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use archi::bridge::mqtt::MqttDeviceBridge;
//! use archi::config::AssistantConfig;
//! use archi::sensor_log::SensorCsvLog;
//!
//! # tokio_test::block_on(async {
//! let config = AssistantConfig::load_from_env()?;
//! let log = SensorCsvLog::new(config.sensor_log_path.clone());
//!
//! let mut bridge = MqttDeviceBridge::new(&config, log);
//! bridge.connect().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod health;
pub mod inbound;

// Re-export public types for convenience
pub use client::MqttDeviceBridge;
pub use connection::{ConnectionState, ReconnectConfig};
pub use health::{ConnectionEvent, ReconnectStep};
pub use inbound::{EventRoute, EventRouter, PublishKind, ReadingRecorder};
