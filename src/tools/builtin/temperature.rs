//! Tool exposing the bridge's cached temperature reading.

use crate::bridge::DeviceBridge;
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Reports the most recent temperature the bridge has received.
///
/// The reading comes from the bridge's in-memory cell, not the CSV log,
/// so the call never touches disk. Before the first sensor message
/// arrives there is nothing to report and the tool says so instead of
/// failing.
pub struct CurrentTemperatureTool {
    bridge: Arc<dyn DeviceBridge>,
}

impl CurrentTemperatureTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Tool for CurrentTemperatureTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_current_temperature".to_string(),
            description: "Gives the current temperature in Celsius.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        match self.bridge.current_temperature() {
            Some(reading) => Ok(json!({
                "temperature": reading.value,
                "unit": "°C",
                "observed_at": reading.timestamp.to_rfc3339(),
            })),
            None => Ok(json!({
                "temperature": null,
                "unit": "°C",
                "message": "No temperature reading has been received yet",
            })),
        }
    }
}
