//! Providers module - chat-completion backends (Claude, Gemini, OpenAI)
//!
//! Every backend implements [`Provider`]: it receives the system prompt and
//! the provider-agnostic history, declares the single `run_shell` tool and
//! returns a [`Response`]. [`build_provider`] picks the backend from config.
//!
//! # Example
//!
//! ```rust,ignore
//! use petclaw::providers::{ClaudeProvider, ConversationTurn, Provider};
//!
//! async fn example() {
//!     let provider = ClaudeProvider::new("your-api-key", 1024);
//!     let history = vec![ConversationTurn::user("How is the host doing?")];
//!     let response = provider.send("You are a pet.", &history).await.unwrap();
//!     println!("{}", response.text);
//! }
//! ```

pub mod claude;
pub mod gemini;
pub mod openai;
mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{PetError, ProviderError};

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
pub use types::{ConversationTurn, Provider, Response, Role, ToolCall, ToolDefinition, ToolResult};

/// Name of the only tool the model may call.
pub const RUN_SHELL_TOOL: &str = "run_shell";

/// Per-request HTTP timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// The `run_shell` tool declared to every backend, advertising the
/// sandbox's output cap.
pub fn run_shell_tool(max_output_bytes: usize) -> ToolDefinition {
    ToolDefinition::new(
        RUN_SHELL_TOOL,
        &format!(
            "Execute a shell command on the host. Use this to check system status, \
             manage services, or investigate issues. Commands have a timeout and \
             blocked patterns for safety. Output is truncated to {}.",
            format_byte_cap(max_output_bytes)
        ),
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        }),
    )
}

fn format_byte_cap(bytes: usize) -> String {
    if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
///
/// This centralizes the mapping from HTTP status codes to error classifications
/// so that every backend produces consistent typed errors.
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        408 => ProviderError::Timeout(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        529 => ProviderError::Overloaded(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}

/// Map a transport failure onto the error type, keeping timeouts typed.
pub(crate) fn transport_error(err: reqwest::Error) -> PetError {
    if err.is_timeout() {
        PetError::ProviderTyped(ProviderError::Timeout(err.to_string()))
    } else {
        PetError::Http(err)
    }
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Which backend [`build_provider`] would construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Claude,
    Gemini,
    OpenAI,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Claude => "claude",
            Backend::Gemini => "gemini",
            Backend::OpenAI => "openai",
        }
    }
}

/// Resolve the backend: forced by `ai.provider`, otherwise the first of
/// claude, gemini, openai with a usable API key.
pub fn select_backend(config: &Config) -> Option<Backend> {
    let has_key = |backend: Backend| {
        let provider = match backend {
            Backend::Claude => &config.providers.anthropic,
            Backend::Gemini => &config.providers.gemini,
            Backend::OpenAI => &config.providers.openai,
        };
        provider.as_ref().and_then(|p| p.key()).is_some()
    };

    match config.ai.provider.as_deref() {
        Some(forced) => {
            let backend = match forced {
                "claude" => Backend::Claude,
                "gemini" => Backend::Gemini,
                "openai" => Backend::OpenAI,
                other => {
                    warn!(provider = %other, "Unknown ai.provider");
                    return None;
                }
            };
            if has_key(backend) {
                Some(backend)
            } else {
                warn!(provider = %forced, "ai.provider is set but its API key is missing");
                None
            }
        }
        None => [Backend::Claude, Backend::Gemini, Backend::OpenAI]
            .into_iter()
            .find(|b| has_key(*b)),
    }
}

/// Build the configured provider, or `None` when no credential is available.
pub fn build_provider(config: &Config) -> Option<Arc<dyn Provider>> {
    let backend = select_backend(config)?;
    let max_tokens = config.ai.max_tokens;
    let output_cap = config.shell.max_output_bytes;

    let provider: Arc<dyn Provider> = match backend {
        Backend::Claude => {
            let cfg = config.providers.anthropic.as_ref()?;
            let mut p = ClaudeProvider::new(cfg.key()?, max_tokens).with_output_cap(output_cap);
            if let Some(model) = &cfg.model {
                p = p.with_model(model);
            }
            if let Some(base) = &cfg.api_base {
                p = p.with_base_url(base);
            }
            Arc::new(p)
        }
        Backend::Gemini => {
            let cfg = config.providers.gemini.as_ref()?;
            let mut p = GeminiProvider::new(cfg.key()?, max_tokens).with_output_cap(output_cap);
            if let Some(model) = &cfg.model {
                p = p.with_model(model);
            }
            if let Some(base) = &cfg.api_base {
                p = p.with_base_url(base);
            }
            Arc::new(p)
        }
        Backend::OpenAI => {
            let cfg = config.providers.openai.as_ref()?;
            let mut p = OpenAIProvider::new(cfg.key()?, max_tokens).with_output_cap(output_cap);
            if let Some(model) = &cfg.model {
                p = p.with_model(model);
            }
            if let Some(base) = &cfg.api_base {
                p = p.with_base_url(base);
            }
            Arc::new(p)
        }
    };

    info!(provider = provider.name(), model = provider.model(), "AI provider selected");
    Some(provider)
}
