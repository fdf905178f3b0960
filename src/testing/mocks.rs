//! Mock implementations for testing
//!
//! Provides mock DeviceBridge, LlmProvider, and Tool implementations so
//! session and tool logic can be tested without a broker, an Ollama
//! daemon, or the network.

use crate::bridge::{BridgeError, ConnectionState, DeviceBridge, DeviceId, SensorReading};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Build a plain text completion response.
pub fn text_response(content: impl Into<String>) -> CompletionResponse {
    CompletionResponse {
        content: Some(content.into()),
        model: "mock-model".to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        finish_reason: FinishReason::Stop,
        tool_calls: None,
    }
}

/// Build a completion response that requests a single tool call.
pub fn tool_call_response(name: impl Into<String>, arguments: Value) -> CompletionResponse {
    CompletionResponse {
        content: None,
        model: "mock-model".to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        finish_reason: FinishReason::Stop,
        tool_calls: Some(vec![ToolCall {
            id: "call_0".to_string(),
            name: name.into(),
            arguments,
        }]),
    }
}

/// Mock device bridge for testing.
///
/// Records every display and device command; the cached reading and the
/// connection state are settable from the test body.
pub struct MockDeviceBridge {
    reading: Mutex<Option<SensorReading>>,
    state: Mutex<ConnectionState>,
    display_history: Mutex<Vec<char>>,
    device_history: Mutex<Vec<(DeviceId, bool)>>,
    fail_publishes: AtomicBool,
}

impl MockDeviceBridge {
    pub fn new() -> Self {
        Self {
            reading: Mutex::new(None),
            state: Mutex::new(ConnectionState::Connected),
            display_history: Mutex::new(Vec::new()),
            device_history: Mutex::new(Vec::new()),
            fail_publishes: AtomicBool::new(false),
        }
    }

    /// Set or clear the cached temperature reading.
    pub fn set_reading(&self, reading: Option<SensorReading>) {
        *self.reading.lock().unwrap() = reading;
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Make subsequent publish operations fail.
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    pub fn displayed_characters(&self) -> Vec<char> {
        self.display_history.lock().unwrap().clone()
    }

    pub fn device_commands(&self) -> Vec<(DeviceId, bool)> {
        self.device_history.lock().unwrap().clone()
    }
}

impl Default for MockDeviceBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceBridge for MockDeviceBridge {
    fn current_temperature(&self) -> Option<SensorReading> {
        *self.reading.lock().unwrap()
    }

    async fn set_display_character(&self, character: char) -> Result<(), BridgeError> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionFailed(
                "Mock publish failure".to_string(),
            ));
        }
        self.display_history.lock().unwrap().push(character);
        Ok(())
    }

    async fn set_device(&self, device: DeviceId, on: bool) -> Result<bool, BridgeError> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionFailed(
                "Mock publish failure".to_string(),
            ));
        }
        self.device_history.lock().unwrap().push((device, on));
        Ok(on)
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.lock().unwrap().clone()
    }
}

/// Mock LLM provider that replays a scripted sequence of responses.
///
/// Responses are consumed in order; once the script runs out the last
/// response repeats, so a chat loop that asks one extra time terminates
/// instead of cycling back to an earlier tool call.
pub struct MockLlmProvider {
    responses: Vec<CompletionResponse>,
    next_index: Mutex<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
    should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses,
            next_index: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    pub fn single_response(content: impl Into<String>) -> Self {
        Self::new(vec![text_response(content)])
    }

    pub fn with_failure() -> Self {
        Self {
            responses: vec![],
            next_index: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    /// Requests seen so far, in order.
    pub fn received_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.should_fail {
            return Err(LlmError::ApiError("Mock LLM failure".to_string()));
        }

        self.requests.lock().unwrap().push(request);

        let mut next = self.next_index.lock().unwrap();
        let index = (*next).min(self.responses.len().saturating_sub(1));
        *next += 1;

        Ok(self
            .responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| text_response("Mock response")))
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::ApiError("Mock health check failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Scripted tool for registry and session tests.
pub struct MockTool {
    name: String,
    response: Value,
    should_fail: bool,
    invocations: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, response: Value) -> Self {
        Self {
            name: name.into(),
            response,
            should_fail: false,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A tool whose execution always fails.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: Value::Null,
            should_fail: true,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle for inspecting invocations after the tool moves into a
    /// registry.
    pub fn invocations_handle(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.invocations)
    }
}

#[async_trait]
impl Tool for MockTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: format!("Mock tool {}", self.name),
            parameters: json!({ "type": "object" }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        self.invocations.lock().unwrap().push(parameters.clone());
        if self.should_fail {
            return Err(ToolError::ExecutionError(format!(
                "Mock tool failure: {}",
                self.name
            )));
        }
        Ok(self.response.clone())
    }
}
