//! Provider-agnostic completion types and the `LlmProvider` trait.
//!
//! The chat session talks to the language model exclusively through this
//! interface, so the Ollama implementation can be swapped for a mock in
//! tests without touching session logic.

use crate::tools::ToolDescription;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request for a chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full conversation history, system prompt first.
    pub messages: Vec<Message>,
    /// Model identifier as the provider understands it.
    pub model: String,
    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens. `None` means unbounded.
    pub max_tokens: Option<u32>,
    /// Tools the model may call this turn.
    pub tools: Option<Vec<ToolDescription>>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier for correlating the call with its result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of the response.
    Stop,
    /// Token limit reached; the response may be truncated.
    Length,
    /// The provider reported something unrecognized.
    Error,
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Assistant text, absent when the model only requested tool calls.
    pub content: Option<String>,
    /// Model that actually served the request.
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
    /// Tool invocations the model wants executed before it can answer.
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl CompletionResponse {
    /// True when the model asked for at least one tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Errors from LLM provider operations.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// Interface every language model backend implements.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Models this provider is configured to serve.
    fn available_models(&self) -> Vec<String>;

    /// Run one chat completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<(), LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::System).unwrap(),
            "\"system\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::User).unwrap(),
            "\"user\""
        );
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_round_trip() {
        let message = Message {
            role: MessageRole::User,
            content: "turn on device 1".to_string(),
        };
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_has_tool_calls() {
        let mut response = CompletionResponse {
            content: Some("done".to_string()),
            model: "llama3.2:3b".to_string(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            tool_calls: None,
        };
        assert!(!response.has_tool_calls());

        response.tool_calls = Some(vec![]);
        assert!(!response.has_tool_calls());

        response.tool_calls = Some(vec![ToolCall {
            id: "call_0".to_string(),
            name: "get_current_temperature".to_string(),
            arguments: serde_json::json!({}),
        }]);
        assert!(response.has_tool_calls());
    }

    #[test]
    fn test_llm_error_display() {
        let errors = vec![
            LlmError::NotConfigured("missing model".to_string()),
            LlmError::ModelNotFound("llama9".to_string()),
            LlmError::InvalidResponse("empty body".to_string()),
            LlmError::NetworkError("connection refused".to_string()),
            LlmError::ApiError("500".to_string()),
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_token_usage_default_is_zero() {
        let usage = TokenUsage::default();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }
}
