//! Web search tool backed by the Tavily API.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Result count is fixed; the model sees at most this many hits.
const MAX_RESULTS: usize = 3;

/// Web search over the Tavily API.
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl WebSearchTool {
    /// Create the tool. Fails when the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ToolError::InitializationError(
                "Tavily API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::InitializationError(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: TAVILY_ENDPOINT.to_string(),
        })
    }

    /// Point the tool at a different search endpoint. Tests use this to
    /// target a local stub server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build search payload (pure function)
    fn build_search_payload(query: &str) -> Value {
        json!({
            "query": query,
            "max_results": MAX_RESULTS,
        })
    }

    /// Keep only the fields the model needs from each hit (pure function)
    fn parse_search_response(search_result: &Value) -> Vec<Value> {
        let mut formatted_results = Vec::new();

        if let Some(results) = search_result.get("results").and_then(|r| r.as_array()) {
            for result in results.iter().take(MAX_RESULTS) {
                if let (Some(title), Some(url)) = (
                    result.get("title").and_then(|t| t.as_str()),
                    result.get("url").and_then(|u| u.as_str()),
                ) {
                    let content = result.get("content").and_then(|c| c.as_str()).unwrap_or("");

                    formatted_results.push(json!({
                        "title": title,
                        "url": url,
                        "content": content
                    }));
                }
            }
        }

        formatted_results
    }

    /// Format final search response (pure function)
    fn format_search_response(query: &str, results: Vec<Value>) -> Value {
        json!({
            "query": query,
            "results": results
        })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "web_search".to_string(),
            description: "Search the web for current information.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Search query"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let query = parameters["query"]
            .as_str()
            .ok_or_else(|| ToolError::ExecutionError("query must be a string".to_string()))?;

        debug!("Searching Tavily for: {}", query);
        let payload = Self::build_search_payload(query);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolError::ExecutionError(format!(
                "Tavily API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let search_result: Value = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to parse response: {e}")))?;

        let results = Self::parse_search_response(&search_result);
        Ok(Self::format_search_response(query, results))
    }
}
