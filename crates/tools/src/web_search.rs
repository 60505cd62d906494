//! Web search tool, queries a Tavily-compatible search API.
//!
//! The whole request (connect, send, read body) is bounded by the configured
//! timeout; on expiry the tool fails with [`ToolError::Timeout`].

use std::time::Duration;

use agentchat_config::SearchConfig;
use agentchat_core::error::ToolError;
use agentchat_core::tool::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const NAME: &str = "web_search";

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    timeout: Duration,
    max_results: u32,
    search_depth: String,
}

impl WebSearchTool {
    pub fn from_config(config: &SearchConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ToolError::Registration(format!("web_search HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
        })
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<String, ToolError> {
        let body = serde_json::json!({
            "api_key": api_key,
            "query": query.trim(),
            "search_depth": self.search_depth,
            "max_results": self.max_results,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::failed(NAME, format!("Search request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error = response.text().await.unwrap_or_default();
            warn!(status, "Search API returned error");
            return Err(ToolError::failed(NAME, format!("Tavily API error: {error}")));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::failed(NAME, format!("Invalid search response: {e}")))?;

        Ok(format_results(query, &data.results))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search the web for current information on any topic"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to look up on the web"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::failed(NAME, "Invalid search query"))?;

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::failed(NAME, "TAVILY_API_KEY not found in environment variables")
        })?;

        debug!(query = %query, "Searching the web");

        tokio::time::timeout(self.timeout, self.search(api_key, query))
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: NAME.into(),
                timeout_secs: self.timeout.as_secs(),
            })?
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Render results as a numbered list the model can read.
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let summary = results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}", i + 1, r.title, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Search results for \"{query}\":\n\n{summary}")
}
