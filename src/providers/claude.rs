//! Claude (Anthropic) provider implementation
//!
//! Talks to the Messages API. The system prompt travels in its own field,
//! tool calls are `tool_use` blocks on assistant messages, and tool results
//! are `tool_result` blocks on a following user message.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_MAX_OUTPUT_BYTES;
use crate::error::{PetError, Result};

use super::{
    http_client, parse_provider_error, run_shell_tool, transport_error, ConversationTurn,
    Provider, Response, Role, ToolCall,
};

/// The Claude API endpoint URL.
const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// The default Claude model to use.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude/Anthropic provider.
pub struct ClaudeProvider {
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    output_cap: usize,
    client: Client,
}

impl ClaudeProvider {
    /// Create a new Claude provider with the given API key.
    ///
    /// # Example
    /// ```
    /// use petclaw::providers::{ClaudeProvider, Provider};
    ///
    /// let provider = ClaudeProvider::new("sk-ant-api03-xxx", 1024);
    /// assert_eq!(provider.name(), "claude");
    /// ```
    pub fn new(api_key: &str, max_tokens: u32) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: CLAUDE_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens,
            output_cap: DEFAULT_MAX_OUTPUT_BYTES,
            client: http_client(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point at a different Messages endpoint (proxies, gateways).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Output cap advertised in the `run_shell` description.
    pub fn with_output_cap(mut self, bytes: usize) -> Self {
        self.output_cap = bytes;
        self
    }

    fn build_request(&self, system_prompt: &str, history: &[ConversationTurn]) -> ClaudeRequest {
        let tool = run_shell_tool(self.output_cap);
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system_prompt.to_string(),
            messages: convert_history(history),
            tools: vec![ClaudeTool {
                name: tool.name,
                description: tool.description,
                input_schema: tool.parameters,
            }],
        }
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    async fn send(&self, system_prompt: &str, history: &[ConversationTurn]) -> Result<Response> {
        let request = self.build_request(system_prompt, history);
        debug!(model = %self.model, turns = history.len(), "Sending Claude request");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();

            let body = if let Ok(error_response) =
                serde_json::from_str::<ClaudeErrorResponse>(&error_text)
            {
                if error_response.error.r#type == "overloaded_error" {
                    return Err(PetError::from(crate::error::ProviderError::Overloaded(
                        error_response.error.message,
                    )));
                }
                format!(
                    "Claude API error: {} - {}",
                    error_response.error.r#type, error_response.error.message
                )
            } else {
                format!("Claude API error: {}", error_text)
            };

            return Err(PetError::from(parse_provider_error(status, &body)));
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(transport_error)?;
        Ok(convert_response(claude_response))
    }

    fn name(&self) -> &str {
        "claude"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Claude API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
    tools: Vec<ClaudeTool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaudeMessage {
    /// "user" or "assistant"
    role: String,
    content: ClaudeContent,
}

/// Claude message content - can be simple text or content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ClaudeContent {
    Text(String),
    Blocks(Vec<ClaudeContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ClaudeContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this adapter does not use (thinking, etc.)
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

// ============================================================================
// Claude API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    /// "end_turn", "tool_use", "max_tokens", ...
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
    error: ClaudeError,
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    r#type: String,
    message: String,
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn convert_history(history: &[ConversationTurn]) -> Vec<ClaudeMessage> {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role() {
                Role::User => "user",
                Role::Assistant => "assistant",
            }
            .to_string();

            let content = if turn.has_tool_results() {
                ClaudeContent::Blocks(
                    turn.results()
                        .iter()
                        .map(|r| ClaudeContentBlock::ToolResult {
                            tool_use_id: r.id.clone(),
                            content: r.content.clone(),
                            is_error: r.is_error,
                        })
                        .collect(),
                )
            } else if turn.has_tool_calls() {
                let mut blocks = Vec::with_capacity(turn.calls().len() + 1);
                if !turn.text().is_empty() {
                    blocks.push(ClaudeContentBlock::Text {
                        text: turn.text().to_string(),
                    });
                }
                for tc in turn.calls() {
                    let input: serde_json::Value =
                        serde_json::from_str(&tc.arguments).unwrap_or(serde_json::json!({}));
                    blocks.push(ClaudeContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input,
                    });
                }
                ClaudeContent::Blocks(blocks)
            } else {
                ClaudeContent::Text(turn.text().to_string())
            };

            ClaudeMessage { role, content }
        })
        .collect()
}

fn convert_response(response: ClaudeResponse) -> Response {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ClaudeContentBlock::Text { text: t } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&t);
            }
            ClaudeContentBlock::ToolUse { id, name, input } => {
                let arguments = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_string());
                tool_calls.push(ToolCall::new(&id, &name, &arguments));
            }
            ClaudeContentBlock::ToolResult { .. } | ClaudeContentBlock::Unsupported => {}
        }
    }

    if response.stop_reason.as_deref() == Some("tool_use") {
        Response::with_tools(&text, tool_calls)
    } else {
        Response::text(&text)
    }
}

// ============================================================================
// Tests
// ============================================================================
