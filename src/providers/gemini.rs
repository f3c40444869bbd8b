//! Gemini (Google) provider implementation
//!
//! Uses the `generateContent` REST endpoint. Gemini identifies function
//! responses by function name and only sometimes assigns call ids, so the
//! adapter synthesizes ids for calls that lack one and maps each result back
//! to its function name through the preceding assistant turn.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::DEFAULT_MAX_OUTPUT_BYTES;
use crate::error::{PetError, Result};

use super::{
    http_client, parse_provider_error, run_shell_tool, transport_error, ConversationTurn,
    Provider, Response, Role, ToolCall,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default Gemini model to use.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Prefix for ids the adapter made up; they are never sent back on the wire.
const SYNTHETIC_ID_PREFIX: &str = "gemini-call-";

/// Google Gemini provider.
pub struct GeminiProvider {
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    output_cap: usize,
    client: Client,
}

impl GeminiProvider {
    /// # Example
    /// ```
    /// use petclaw::providers::{GeminiProvider, Provider};
    ///
    /// let provider = GeminiProvider::new("g-key", 1024);
    /// assert_eq!(provider.name(), "gemini");
    /// assert_eq!(provider.model(), "gemini-2.5-flash");
    /// ```
    pub fn new(api_key: &str, max_tokens: u32) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
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

    pub fn with_base_url(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Output cap advertised in the `run_shell` description.
    pub fn with_output_cap(mut self, bytes: usize) -> Self {
        self.output_cap = bytes;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request(&self, system_prompt: &str, history: &[ConversationTurn]) -> GeminiRequest {
        let tool = run_shell_tool(self.output_cap);
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(system_prompt)],
            },
            contents: convert_history(history),
            tools: vec![GeminiTool {
                function_declarations: vec![GeminiFunctionDeclaration {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.parameters,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn send(&self, system_prompt: &str, history: &[ConversationTurn]) -> Result<Response> {
        let request = self.build_request(system_prompt, history);
        debug!(model = %self.model, turns = history.len(), "Sending Gemini request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                Ok(parsed) => format!(
                    "Gemini API error: {} - {}",
                    parsed.error.status, parsed.error.message
                ),
                Err(_) => format!("Gemini API error: {}", error_text),
            };
            return Err(PetError::from(parse_provider_error(status, &body)));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(transport_error)?;
        convert_response(gemini_response)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    tools: Vec<GeminiTool>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    /// "user" or "model"; absent on the system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
    /// Set on reasoning summaries, which are not part of the answer
    #[serde(default, skip_serializing)]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    status: String,
    message: String,
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Only provider-assigned ids go back on the wire.
fn wire_id(id: &str) -> Option<String> {
    if id.starts_with(SYNTHETIC_ID_PREFIX) {
        None
    } else {
        Some(id.to_string())
    }
}

fn convert_history(history: &[ConversationTurn]) -> Vec<GeminiContent> {
    // id -> function name, from every assistant turn seen so far
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut contents = Vec::with_capacity(history.len());

    for turn in history {
        let role = match turn.role() {
            Role::User => "user",
            Role::Assistant => "model",
        };

        let mut parts = Vec::new();
        if turn.has_tool_results() {
            for result in turn.results() {
                let name = names
                    .get(result.id.as_str())
                    .copied()
                    .unwrap_or(super::RUN_SHELL_TOOL);
                let response = if result.is_error {
                    json!({"output": result.content, "error": true})
                } else {
                    json!({"output": result.content})
                };
                parts.push(GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        id: wire_id(&result.id),
                        name: name.to_string(),
                        response,
                    }),
                    ..Default::default()
                });
            }
        } else {
            if !turn.text().is_empty() {
                parts.push(GeminiPart::text(turn.text()));
            }
            for call in turn.calls() {
                names.insert(call.id.as_str(), call.name.as_str());
                let args = serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                parts.push(GeminiPart {
                    function_call: Some(GeminiFunctionCall {
                        id: wire_id(&call.id),
                        name: call.name.clone(),
                        args,
                    }),
                    ..Default::default()
                });
            }
        }

        contents.push(GeminiContent {
            role: Some(role.to_string()),
            parts,
        });
    }

    contents
}

fn convert_response(response: GeminiResponse) -> Result<Response> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PetError::Provider("Gemini returned no candidates".into()))?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for (index, part) in parts.into_iter().enumerate() {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("{}{}-{}", SYNTHETIC_ID_PREFIX, call.name, index));
            let arguments = if call.args.is_null() {
                "{}".to_string()
            } else {
                call.args.to_string()
            };
            tool_calls.push(ToolCall::new(&id, &call.name, &arguments));
        }
    }

    if tool_calls.is_empty() && text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            debug!(finish_reason = %reason, "Gemini returned an empty candidate");
        }
    }

    Ok(Response::with_tools(&text, tool_calls))
}
