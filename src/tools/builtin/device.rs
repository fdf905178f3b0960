//! Tools for switching the relay-controlled devices.

use crate::bridge::{DeviceBridge, DeviceId};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Turns one device on or off through the bridge.
///
/// One instance is registered per device, so `toggle_device1` and
/// `toggle_device2` share this implementation and report their result in
/// the same format.
pub struct DeviceToggleTool {
    bridge: Arc<dyn DeviceBridge>,
    device: DeviceId,
}

impl DeviceToggleTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>, device: DeviceId) -> Self {
        Self { bridge, device }
    }

    /// Confirmation string the model relays back to the user (pure function)
    fn format_result(device: DeviceId, on: bool) -> String {
        let output = if on { "on" } else { "off" };
        format!("Device {} is turned {}\n", device.number(), output)
    }
}

#[async_trait]
impl Tool for DeviceToggleTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: format!("toggle_device{}", self.device.number()),
            description: format!("Turn device {} on or off.", self.device.number()),
            parameters: json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "boolean",
                        "description": format!(
                            "True to turn on device {}, false to turn off",
                            self.device.number()
                        )
                    }
                },
                "required": ["state"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let requested = parameters["state"]
            .as_bool()
            .ok_or_else(|| ToolError::ExecutionError("state must be a boolean".to_string()))?;

        let resulting = self
            .bridge
            .set_device(self.device, requested)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(json!(Self::format_result(self.device, resulting)))
    }
}
