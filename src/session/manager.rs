//! Chat session state and the model/tool round-trip loop.

use crate::config::LlmSettings;
use crate::error::{sanitize_error_message, AssistantError, AssistantResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, MessageRole, ToolCall,
};
use crate::observability::session_span;
use crate::tools::ToolRegistry;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

const SYSTEM_PROMPT: &str = "You are a helpful home assistant. Your name is Archi. \
    Do not call tools unless the user explicitly requests it. \
    If the user's request cannot be fulfilled with the provided tools, respond appropriately.";

/// Upper bound on model/tool round trips within one user turn.
const MAX_TOOL_ITERATIONS: usize = 10;

/// One conversation with the assistant.
///
/// Holds the full message history in memory, keyed by a UUID session id.
/// Each user turn runs the model, executes any tool calls it requests,
/// feeds the results back, and repeats until the model answers in plain
/// text or the iteration cap is hit.
pub struct ChatSession {
    id: Uuid,
    history: Vec<Message>,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    turns: u64,
}

impl ChatSession {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        settings: &LlmSettings,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, model = %settings.model, "Starting chat session");
        Self {
            id,
            history: vec![Self::build_system_message(Local::now())],
            provider,
            tools,
            model: settings.model.clone(),
            temperature: settings.temperature,
            turns: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Messages exchanged so far, system prompt first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Run one user turn and return the assistant's final text.
    pub async fn run_turn(&mut self, user_input: &str) -> AssistantResult<String> {
        self.turns += 1;
        let span = session_span!(session_id = %self.id, turn = self.turns);
        self.process_turn(user_input).instrument(span).await
    }

    async fn process_turn(&mut self, user_input: &str) -> AssistantResult<String> {
        self.history.push(Message {
            role: MessageRole::User,
            content: user_input.to_string(),
        });

        let descriptions = self.tools.descriptions();
        let tools = if descriptions.is_empty() {
            None
        } else {
            Some(descriptions)
        };

        let mut iteration = 0;
        loop {
            iteration += 1;
            Self::check_iteration_limit(iteration, MAX_TOOL_ITERATIONS)?;

            let request = CompletionRequest {
                messages: self.history.clone(),
                model: self.model.clone(),
                temperature: Some(self.temperature),
                max_tokens: None,
                tools: tools.clone(),
            };

            let response = self.provider.complete(request).await?;
            debug!(
                iteration,
                content_length = response.content.as_ref().map(|c| c.len()).unwrap_or(0),
                tool_calls = response.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
                tokens = response.usage.total_tokens,
                "Model responded"
            );

            Self::add_assistant_response(&mut self.history, &response);

            if response.has_tool_calls() {
                if let Some(tool_calls) = &response.tool_calls {
                    debug!(
                        iteration,
                        tool_count = tool_calls.len(),
                        "Processing tool calls"
                    );
                    let tool_results = self.execute_tool_calls(tool_calls).await;
                    Self::add_tool_results(&mut self.history, &tool_results);
                    continue;
                }
            }

            info!(iterations = iteration, "Chat turn completed");
            return Ok(Self::extract_final_content(&response));
        }
    }

    /// Execute all tool calls from one model response, in order.
    async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut tool_results = Vec::new();
        for tool_call in tool_calls {
            let result = self.execute_single_tool_call(tool_call).await;
            tool_results.push(result);
        }
        tool_results
    }

    /// Run one tool call. Failures become conversation text so the model
    /// can correct itself on the next round trip.
    async fn execute_single_tool_call(&self, tool_call: &ToolCall) -> String {
        debug!(
            "Executing tool: {} with args: {}",
            tool_call.name, tool_call.arguments
        );

        match self
            .tools
            .execute_tool(&tool_call.name, &tool_call.arguments)
            .await
        {
            Ok(result) => format!("Tool {} returned: {}", tool_call.name, result),
            Err(e) => {
                warn!("Tool {} failed: {}", tool_call.name, e);
                format!(
                    "Tool {} failed: {}. Please fix your mistakes.",
                    tool_call.name,
                    sanitize_error_message(&e.to_string())
                )
            }
        }
    }

    /// System prompt with the session start time baked in (pure function)
    fn build_system_message(now: DateTime<Local>) -> Message {
        Message {
            role: MessageRole::System,
            content: format!(
                "{SYSTEM_PROMPT}\nCurrent time: {}.",
                now.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }

    /// Add assistant response to the history (pure function)
    fn add_assistant_response(messages: &mut Vec<Message>, response: &CompletionResponse) {
        if let Some(content) = &response.content {
            messages.push(Message {
                role: MessageRole::Assistant,
                content: content.clone(),
            });
        }
    }

    /// Add tool results to the history (pure function)
    fn add_tool_results(messages: &mut Vec<Message>, tool_results: &[String]) {
        if !tool_results.is_empty() {
            messages.push(Message {
                role: MessageRole::User,
                content: format!("Tool results:\n{}", tool_results.join("\n")),
            });
        }
    }

    /// Fail the turn once the cap is exceeded (pure validation)
    fn check_iteration_limit(iteration: usize, max_iterations: usize) -> AssistantResult<()> {
        if iteration > max_iterations {
            return Err(AssistantError::Session(format!(
                "Tool execution exceeded maximum iterations ({max_iterations})"
            )));
        }
        Ok(())
    }

    /// Final text from the model, empty string when it gave none (pure function)
    fn extract_final_content(response: &CompletionResponse) -> String {
        response.content.clone().unwrap_or_default()
    }
}
