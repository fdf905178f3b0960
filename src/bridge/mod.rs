//! Device bridge for the MQTT-connected home hardware
//!
//! This module provides the bridge abstraction and its MQTT implementation.
//! The bridge owns the broker connection, ingests temperature readings from
//! the sensor topic, and publishes display/device commands on behalf of the
//! chat tools.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod mqtt;

pub use crate::sensor_log::SensorReading;
pub use mqtt::ConnectionState;

/// One of the two switchable devices on the bridge.
///
/// `Display` renders the wire/config name (`device1`, `device2`), which is
/// also how the chat tools refer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Device1,
    Device2,
}

impl DeviceId {
    pub const ALL: [DeviceId; 2] = [DeviceId::Device1, DeviceId::Device2];

    /// Ordinal used in user-facing phrasing ("Device 1 is turned on").
    pub fn number(&self) -> u8 {
        match self {
            DeviceId::Device1 => 1,
            DeviceId::Device2 => 2,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Device1 => write!(f, "device1"),
            DeviceId::Device2 => write!(f, "device2"),
        }
    }
}

/// Command payload published to a device topic.
pub fn device_command_payload(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Bridge operation errors
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing to '{topic}' failed")]
    PublishFailed {
        topic: String,
        #[source]
        source: rumqttc::v5::ClientError,
    },
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
    #[error("Connection not confirmed within {timeout_secs}s")]
    ConnectionTimeout { timeout_secs: u64 },
}

/// Device bridge trait for dependency injection and testing
///
/// Chat tools hold an `Arc<dyn DeviceBridge>`; the MQTT implementation is
/// the only production one.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Latest temperature reading, or `None` if nothing has arrived yet.
    ///
    /// Synchronous: reads a cell the ingest task keeps current, never
    /// touches the network.
    fn current_temperature(&self) -> Option<SensorReading>;

    /// Publish one character to the display topic.
    async fn set_display_character(&self, character: char) -> Result<(), BridgeError>;

    /// Publish an on/off command to a device topic.
    ///
    /// Returns the commanded state on success, for both devices alike.
    async fn set_device(&self, device: DeviceId, on: bool) -> Result<bool, BridgeError>;

    /// Current broker connection state.
    fn connection_state(&self) -> ConnectionState;
}

/// Type alias for the production bridge
pub type MqttBridge = mqtt::MqttDeviceBridge;
