//! Tool for putting a character on the matrix display.

use crate::bridge::DeviceBridge;
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Sends a single character to the 8x8 matrix display over the bridge.
pub struct DisplayCharacterTool {
    bridge: Arc<dyn DeviceBridge>,
}

impl DisplayCharacterTool {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Tool for DisplayCharacterTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "set_character".to_string(),
            description: "Sets the character on the 8x8 matrix display.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "character": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": 1,
                        "description": "The character which will be set on the 8x8 matrix display."
                    }
                },
                "required": ["character"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let character = parameters["character"]
            .as_str()
            .and_then(|text| text.chars().next())
            .ok_or_else(|| {
                ToolError::ExecutionError("character must be a single-character string".to_string())
            })?;

        self.bridge
            .set_display_character(character)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(json!({ "character": character, "status": "sent" }))
    }
}
