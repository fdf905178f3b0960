//! Tool layer the chat model calls into.
//!
//! Each tool declares a JSON Schema for its arguments. The registry
//! validates arguments against that schema before the tool body runs, so
//! tool implementations only see well-formed input.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn, Instrument};

use crate::bridge::{DeviceBridge, DeviceId};
use crate::observability::tool_span;

pub mod builtin;

pub use builtin::{CurrentTemperatureTool, DeviceToggleTool, DisplayCharacterTool, WebSearchTool};

/// A capability the chat model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, natural-language description, and argument schema.
    fn describe(&self) -> ToolDescription;

    /// Run the tool. `parameters` have already been validated against the
    /// schema from [`describe`](Tool::describe).
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool metadata handed to the model alongside each completion request.
#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

/// Errors from the tool system.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

/// The set of tools available to a chat session.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Build the standard tool set: the bridge-backed device tools plus
    /// web search.
    pub fn with_builtins(
        bridge: Arc<dyn DeviceBridge>,
        search_api_key: &str,
    ) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        registry.register(Box::new(CurrentTemperatureTool::new(Arc::clone(&bridge))));
        registry.register(Box::new(DisplayCharacterTool::new(Arc::clone(&bridge))));
        registry.register(Box::new(DeviceToggleTool::new(
            Arc::clone(&bridge),
            DeviceId::Device1,
        )));
        registry.register(Box::new(DeviceToggleTool::new(bridge, DeviceId::Device2)));
        registry.register(Box::new(WebSearchTool::new(search_api_key)?));
        Ok(registry)
    }

    /// Add a tool, keyed by its declared name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.describe().name;
        self.tools.insert(name, tool);
    }

    /// Descriptions of every registered tool, in stable name order.
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> =
            self.tools.values().map(|tool| tool.describe()).collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }

    /// Description of one tool, if registered.
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Registered tool names, in stable order.
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments against the tool's schema, then execute it.
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        let description = tool.describe();
        Self::validate_parameters(&description, parameters)?;

        let span = tool_span!(tool = %tool_name);
        async {
            debug!("Executing tool");
            let result = tool.execute(parameters).await;
            match &result {
                Ok(_) => debug!("Tool execution completed"),
                Err(error) => warn!("Tool execution failed: {}", error),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn validate_parameters(
        description: &ToolDescription,
        parameters: &Value,
    ) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        let error_messages: Vec<String> = validator
            .iter_errors(parameters)
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect();

        if error_messages.is_empty() {
            Ok(())
        } else {
            Err(ToolError::ValidationError(error_messages.join("; ")))
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
