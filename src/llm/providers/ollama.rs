//! Ollama provider implementation.
//!
//! Talks to a local Ollama daemon over its native chat API
//! (`POST /api/chat`, non-streaming). Tool definitions go out in the
//! OpenAI-compatible function format Ollama accepts; tool calls come
//! back with arguments already parsed as JSON objects.

use crate::config::LlmSettings;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, TokenUsage, ToolCall as ProviderToolCall,
};
use crate::tools::ToolDescription;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Ollama provider configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            // Local inference on modest hardware can take a while.
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&LlmSettings> for OllamaConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            ..Default::default()
        }
    }
}

/// Ollama provider implementation.
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        if config.model.is_empty() {
            return Err(LlmError::NotConfigured(
                "Ollama model name is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a provider from the assistant's LLM settings.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        Self::new(OllamaConfig::from(settings))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Convert a completion request to Ollama's chat format (pure function)
    fn convert_to_ollama_request(
        request: &CompletionRequest,
        messages: Vec<OllamaMessage>,
        tools: Option<Vec<OllamaTool>>,
    ) -> OllamaChatRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            tools,
            options,
        }
    }

    /// Parse Ollama's chat response (pure function)
    fn parse_chat_response(response: OllamaChatResponse) -> CompletionResponse {
        let usage = TokenUsage {
            prompt_tokens: response.prompt_eval_count,
            completion_tokens: response.eval_count,
            total_tokens: response.prompt_eval_count + response.eval_count,
        };

        let tool_calls = response
            .message
            .tool_calls
            .as_ref()
            .map(|calls| Self::extract_tool_calls(calls));

        // Ollama reports empty text rather than a missing field when the
        // model only produced tool calls.
        let content = match response.message.content {
            ref text if text.is_empty() => None,
            text => Some(text),
        };

        CompletionResponse {
            content,
            model: response.model,
            usage,
            finish_reason: Self::convert_finish_reason(response.done_reason.as_deref()),
            tool_calls,
        }
    }

    /// Assign synthetic call ids; Ollama does not provide any (pure function)
    fn extract_tool_calls(calls: &[OllamaToolCall]) -> Vec<ProviderToolCall> {
        calls
            .iter()
            .enumerate()
            .map(|(index, call)| ProviderToolCall {
                id: format!("call_{index}"),
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect()
    }

    /// Map Ollama's done_reason to internal format (pure function)
    fn convert_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            // Older daemons omit done_reason on normal completion.
            Some("stop") | None => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            _ => FinishReason::Error,
        }
    }

    fn convert_message(message: &Message) -> OllamaMessage {
        OllamaMessage {
            role: match message.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: message.content.clone(),
            tool_calls: None,
        }
    }

    fn convert_tool(tool_desc: &ToolDescription) -> OllamaTool {
        OllamaTool {
            tool_type: "function".to_string(),
            function: OllamaFunction {
                name: tool_desc.name.clone(),
                description: tool_desc.description.clone(),
                parameters: tool_desc.parameters.clone(),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn available_models(&self) -> Vec<String> {
        // The daemon serves whatever has been pulled locally; report the
        // model this provider was configured with.
        vec![self.config.model.clone()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let messages: Vec<OllamaMessage> =
            request.messages.iter().map(Self::convert_message).collect();

        let tools = request
            .tools
            .as_ref()
            .map(|descriptions| descriptions.iter().map(Self::convert_tool).collect());

        debug!(
            "Ollama request: model={}, {} messages, {} tools",
            request.model,
            messages.len(),
            request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let ollama_request = Self::convert_to_ollama_request(&request, messages, tools);
        self.complete_with_retry(ollama_request).await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(self.endpoint("api/tags"))
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::ApiError(format!(
                "Ollama daemon returned {} from /api/tags",
                response.status()
            )))
        }
    }
}

impl OllamaProvider {
    /// Retry orchestrator - handles only I/O and retry logic (impure)
    async fn complete_with_retry(
        &self,
        ollama_request: OllamaChatRequest,
    ) -> Result<CompletionResponse, LlmError> {
        // The first failure is usually the daemon paging the model in, so
        // the delays start generous.
        let backoff_delays = [250u64, 500, 1000];
        let mut last_error = None;

        for (attempt, &delay_ms) in std::iter::once(&0u64)
            .chain(backoff_delays.iter())
            .enumerate()
        {
            if attempt > 0 {
                debug!("Ollama retry attempt {} after {}ms delay", attempt, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.make_api_request(&ollama_request).await {
                Ok(ollama_response) => {
                    if attempt > 0 {
                        debug!("Ollama request succeeded after {} retries", attempt);
                    }

                    let response = Self::parse_chat_response(ollama_response);
                    self.log_response_info(&response);
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Ollama request attempt {} failed: {}", attempt + 1, e);
                    if !Self::should_retry(&e) {
                        error!("Non-retryable Ollama error, aborting: {}", e);
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("Ollama request failed after all retries");
        Err(last_error
            .unwrap_or_else(|| LlmError::NetworkError("All retry attempts failed".to_string())))
    }

    /// Make single API request (impure I/O)
    async fn make_api_request(
        &self,
        ollama_request: &OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let response = self
            .client
            .post(self.endpoint("api/chat"))
            .json(ollama_request)
            .send()
            .await
            .map_err(|e| {
                let error_msg = format!(
                    "HTTP request failed: {} (is_connect: {}, is_timeout: {})",
                    e,
                    e.is_connect(),
                    e.is_timeout()
                );
                warn!("Ollama network error details: {}", error_msg);
                LlmError::NetworkError(error_msg)
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ModelNotFound(format!(
                "{} - {} (pull it with `ollama pull {}`)",
                status, error_text, ollama_request.model
            )));
        }

        if status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            let error_msg = format!("Ollama server error: {status} - {error_text}");
            warn!("{}", error_msg);
            return Err(LlmError::ApiError(error_msg));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Ollama API client error - Status: {}, Response: {}",
                status, error_text
            );
            return Err(LlmError::ApiError(format!(
                "Ollama API error: {status} - {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Check if error should trigger retry (pure)
    fn should_retry(error: &LlmError) -> bool {
        match error {
            LlmError::NetworkError(_) => true,
            LlmError::ApiError(msg) => msg.contains("server error"),
            _ => false,
        }
    }

    /// Log response information (impure)
    fn log_response_info(&self, response: &CompletionResponse) {
        debug!(
            "Ollama response: {} tokens (prompt: {}, completion: {}), finish_reason: {:?}, tool_calls: {}",
            response.usage.total_tokens,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.finish_reason,
            response.tool_calls.as_ref().map(|tc| tc.len()).unwrap_or(0)
        );
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    // Unlike OpenAI, Ollama delivers arguments as a parsed JSON object.
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}
