//! Provider types for PetClaw
//!
//! The provider-agnostic conversation model and the [`Provider`] trait every
//! backend adapter implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned, or synthesized by the adapter when absent
    pub id: String,
    pub name: String,
    /// Raw JSON payload
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call.
    ///
    /// # Example
    /// ```
    /// use petclaw::providers::ToolCall;
    ///
    /// let call = ToolCall::new("toolu_1", "run_shell", r#"{"command": "uptime"}"#);
    /// assert_eq!(call.name, "run_shell");
    /// ```
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// Parse the arguments as a specific type.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.arguments)
    }
}

/// The outcome of executing one [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Matches the originating `ToolCall::id`
    pub id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(id: &str, content: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(id: &str, content: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// One entry of a dialogue history.
///
/// A turn is a plain message, an assistant turn proposing tool calls, or a
/// user-role turn carrying only tool results. The constructors are the only
/// way to build one, so calls and results never share a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    role: Role,
    text: String,
    tool_calls: Vec<ToolCall>,
    tool_results: Vec<ToolResult>,
}

impl ConversationTurn {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            text: text.to_string(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            role: Role::Assistant,
            text: text.to_string(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn assistant_with_tools(text: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.to_string(),
            tool_calls,
            tool_results: Vec::new(),
        }
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            text: String::new(),
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn results(&self) -> &[ToolResult] {
        &self.tool_results
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn has_tool_results(&self) -> bool {
        !self.tool_results.is_empty()
    }
}

/// A single provider reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// `true`: `text` is final and `tool_calls` is empty.
    /// `false`: execute `tool_calls` and resubmit.
    pub done: bool,
}

impl Response {
    /// A final answer.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tool_calls: Vec::new(),
            done: true,
        }
    }

    /// A reply that wants tools run. No calls means done.
    pub fn with_tools(text: &str, tool_calls: Vec<ToolCall>) -> Self {
        let done = tool_calls.is_empty();
        Self {
            text: text.to_string(),
            tool_calls,
            done,
        }
    }
}

/// Definition of a tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A chat-completion backend.
///
/// Implementations translate the provider-agnostic history to their wire
/// format, declare the single `run_shell` tool, and translate the reply back.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the system prompt and full history; return the model's reply.
    async fn send(&self, system_prompt: &str, history: &[ConversationTurn]) -> Result<Response>;

    /// Short backend name (`claude`, `gemini`, `openai`)
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_shapes() {
        let user = ConversationTurn::user("hi");
        assert_eq!(user.role(), Role::User);
        assert!(!user.has_tool_calls() && !user.has_tool_results());

        let call = ToolCall::new("c1", "run_shell", r#"{"command":"uptime"}"#);
        let asst = ConversationTurn::assistant_with_tools("checking", vec![call.clone()]);
        assert_eq!(asst.role(), Role::Assistant);
        assert_eq!(asst.calls(), &[call]);
        assert!(asst.results().is_empty());

        let results = ConversationTurn::tool_results(vec![ToolResult::success("c1", "up 3 days")]);
        assert_eq!(results.role(), Role::User);
        assert!(results.text().is_empty());
        assert!(!results.has_tool_calls());
        assert_eq!(results.results()[0].id, "c1");
    }

    #[test]
    fn test_response_done_flag() {
        assert!(Response::text("bye").done);
        assert!(Response::with_tools("", vec![]).done);
        let r = Response::with_tools("", vec![ToolCall::new("1", "run_shell", "{}")]);
        assert!(!r.done);
    }

    #[test]
    fn test_tool_result_constructors() {
        assert!(!ToolResult::success("a", "ok").is_error);
        assert!(ToolResult::error("a", "nope").is_error);
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Deserialize)]
        struct Args {
            command: String,
        }
        let call = ToolCall::new("1", "run_shell", r#"{"command": "df -h"}"#);
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.command, "df -h");
        assert!(ToolCall::new("1", "run_shell", "{oops")
            .parse_arguments::<Args>()
            .is_err());
    }
}
