//! OpenAI Provider Implementation
//!
//! Chat Completions API. The system prompt is the first message, tool calls
//! ride on assistant messages, and each tool result is its own `tool`
//! message. Works with any OpenAI-compatible endpoint via `api_base`.

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

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// The default OpenAI model to use.
pub const DEFAULT_MODEL: &str = "gpt-4o";

// ============================================================================
// OpenAI API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    tools: Vec<OpenAITool>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    /// "system", "user", "assistant", or "tool"
    role: String,
    /// Null for an assistant message that only carries tool calls
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn plain(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    /// Always "function"
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCallResponse {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// OpenAI (or OpenAI-compatible) provider.
pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    output_cap: usize,
    client: Client,
}

impl OpenAIProvider {
    /// # Example
    /// ```
    /// use petclaw::providers::{OpenAIProvider, Provider};
    ///
    /// let provider = OpenAIProvider::new("sk-xxx", 1024);
    /// assert_eq!(provider.name(), "openai");
    /// ```
    pub fn new(api_key: &str, max_tokens: u32) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: OPENAI_API_URL.to_string(),
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

    /// Use an OpenAI-compatible API (trailing slash will be removed).
    pub fn with_base_url(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Output cap advertised in the `run_shell` description.
    pub fn with_output_cap(mut self, bytes: usize) -> Self {
        self.output_cap = bytes;
        self
    }

    fn build_request(&self, system_prompt: &str, history: &[ConversationTurn]) -> OpenAIRequest {
        let tool = run_shell_tool(self.output_cap);
        OpenAIRequest {
            model: self.model.clone(),
            messages: convert_history(system_prompt, history),
            tools: vec![OpenAITool {
                r#type: "function".to_string(),
                function: OpenAIFunctionDef {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.parameters,
                },
            }],
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn send(&self, system_prompt: &str, history: &[ConversationTurn]) -> Result<Response> {
        let request = self.build_request(system_prompt, history);
        debug!(model = %self.model, turns = history.len(), "Sending OpenAI request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(parsed) => format!(
                    "OpenAI API error: {} - {}",
                    parsed.error.r#type.unwrap_or_default(),
                    parsed.error.message
                ),
                Err(_) => format!("OpenAI API error: {}", error_text),
            };
            return Err(PetError::from(parse_provider_error(status, &body)));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(transport_error)?;
        convert_response(openai_response)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn convert_history(system_prompt: &str, history: &[ConversationTurn]) -> Vec<OpenAIMessage> {
    let mut messages = vec![OpenAIMessage::plain("system", system_prompt)];

    for turn in history {
        if turn.has_tool_results() {
            messages.extend(turn.results().iter().map(|r| OpenAIMessage {
                role: "tool".to_string(),
                content: Some(r.content.clone()),
                tool_calls: None,
                tool_call_id: Some(r.id.clone()),
            }));
            continue;
        }

        match turn.role() {
            Role::User => messages.push(OpenAIMessage::plain("user", turn.text())),
            Role::Assistant if turn.has_tool_calls() => messages.push(OpenAIMessage {
                role: "assistant".to_string(),
                content: (!turn.text().is_empty()).then(|| turn.text().to_string()),
                tool_calls: Some(
                    turn.calls()
                        .iter()
                        .map(|tc| OpenAIToolCallRequest {
                            id: tc.id.clone(),
                            r#type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            }),
            Role::Assistant => messages.push(OpenAIMessage::plain("assistant", turn.text())),
        }
    }

    messages
}

fn convert_response(response: OpenAIResponse) -> Result<Response> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PetError::Provider("OpenAI returned no choices".into()))?;

    let text = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall::new(&tc.id, &tc.function.name, &tc.function.arguments))
        .collect();

    Ok(Response::with_tools(&text, tool_calls))
}
