//! Error types for assistant operations
//!
//! This module rolls the per-layer errors up into one assistant-level type
//! and sanitizes messages before they reach the chat user or the logs.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for assistant operations
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] crate::bridge::BridgeError),

    #[error("Sensor log error: {0}")]
    SensorLog(#[from] crate::sensor_log::SensorLogError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistantError {
    /// Render for the chat user, with secrets redacted and length bounded.
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Result type for assistant operations
pub type AssistantResult<T> = Result<T, AssistantError>;

const MAX_MESSAGE_LEN: usize = 500;
const TRUNCATION_SUFFIX: &str = "...[truncated]";

static SECRET_ASSIGNMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").unwrap());

static CREDENTIAL_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+").unwrap()
});

/// Sanitize error messages to prevent sensitive data leakage.
///
/// Redacts `key=value` style secrets and paths under credential
/// directories, then bounds the result to 500 characters. Applied to
/// everything an LLM or chat user gets to see.
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_ASSIGNMENT_RE.replace_all(message, "${1}=***");
    let sanitized = CREDENTIAL_PATH_RE.replace_all(&sanitized, "/***REDACTED***/");
    truncate_at_char_boundary(sanitized.into_owned())
}

fn truncate_at_char_boundary(mut text: String) -> String {
    if text.len() <= MAX_MESSAGE_LEN {
        return text;
    }

    let mut cut = MAX_MESSAGE_LEN - TRUNCATION_SUFFIX.len();
    // Messages can carry multi-byte text such as the °C unit
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(TRUNCATION_SUFFIX);
    text
}
