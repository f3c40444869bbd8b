//! The tool-use dialogue loop.
//!
//! [`Orchestrator::ask`] admits the request through the rate limiter, builds
//! a system prompt from a fresh state snapshot, then alternates between the
//! provider and the command sandbox until the model is done or the iteration
//! budget runs out.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{PetError, Result};
use crate::pet::StateStore;
use crate::providers::{ConversationTurn, Provider, ToolCall, ToolResult, RUN_SHELL_TOOL};
use crate::sandbox::CommandSandbox;

use super::prompt::build_system_prompt;
use super::rate_limit::RateLimiter;

/// Reply when the rate limiter declines a request.
pub const RATE_LIMITED_REPLY: &str =
    "I need a moment to catch my breath... too many messages! Try again shortly.";

/// Reply when the tool budget is exhausted before the model finishes.
pub const CARRIED_AWAY_REPLY: &str =
    "I got a bit carried away investigating... let me summarize what I found so far.";

#[derive(Debug, Deserialize)]
struct ShellArgs {
    command: String,
}

/// Drives the provider through a bounded multi-turn tool-use dialogue.
///
/// Construct once per process and share by reference or `Arc`; concurrent
/// `ask` calls each own their history and only share the rate budget.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    sandbox: Arc<CommandSandbox>,
    state: Arc<StateStore>,
    limiter: RateLimiter,
    max_tool_iterations: u32,
    personality: Option<String>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        sandbox: Arc<CommandSandbox>,
        state: Arc<StateStore>,
        limiter: RateLimiter,
        max_tool_iterations: u32,
    ) -> Self {
        Self {
            provider,
            sandbox,
            state,
            limiter,
            max_tool_iterations,
            personality: None,
        }
    }

    /// Wire up limits from config.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn Provider>,
        sandbox: Arc<CommandSandbox>,
        state: Arc<StateStore>,
    ) -> Self {
        Self::new(
            provider,
            sandbox,
            state,
            RateLimiter::new(config.ai.rate_limit, config.rate_window()),
            config.ai.max_tool_iterations,
        )
    }

    /// Species flavour text injected into the system prompt.
    pub fn with_personality(mut self, personality: &str) -> Self {
        self.personality = Some(personality.to_string());
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    /// Answer one user message.
    ///
    /// Rate-limited requests and exhausted tool budgets produce canned text,
    /// not errors. Provider failures abort and are returned. Cancelling
    /// `cancel` drops the in-flight provider request, kills any running
    /// command and yields [`PetError::Cancelled`].
    pub async fn ask(&self, cancel: &CancellationToken, user_text: &str) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(PetError::Cancelled);
        }
        if !self.limiter.allow() {
            info!(
                limit = self.limiter.limit(),
                in_window = self.limiter.in_window(),
                "Dialogue request rate-limited"
            );
            return Ok(RATE_LIMITED_REPLY.to_string());
        }

        self.state.touch_interaction();
        let system_prompt =
            build_system_prompt(&self.state.snapshot(), self.personality.as_deref());
        let mut history = vec![ConversationTurn::user(user_text)];

        for iteration in 0..=self.max_tool_iterations {
            debug!(
                iteration,
                turns = history.len(),
                provider = self.provider.name(),
                "Sending dialogue turn"
            );

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PetError::Cancelled),
                response = self.provider.send(&system_prompt, &history) => response,
            };
            let response = response.map_err(|e| {
                let (kind, retryable) = match &e {
                    PetError::ProviderTyped(pe) => (pe.kind(), pe.is_retryable()),
                    _ => ("other", false),
                };
                error!(
                    provider = self.provider.name(),
                    kind,
                    retryable,
                    error = %e,
                    "AI provider request failed"
                );
                e
            })?;

            if response.done || response.tool_calls.is_empty() {
                return Ok(response.text);
            }

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                results.push(self.execute_tool(cancel, call).await);
                if cancel.is_cancelled() {
                    return Err(PetError::Cancelled);
                }
            }

            history.push(ConversationTurn::assistant_with_tools(
                &response.text,
                response.tool_calls,
            ));
            history.push(ConversationTurn::tool_results(results));
        }

        warn!(max = self.max_tool_iterations, "Hit max tool iterations");
        Ok(CARRIED_AWAY_REPLY.to_string())
    }

    async fn execute_tool(&self, cancel: &CancellationToken, call: &ToolCall) -> ToolResult {
        if call.name != RUN_SHELL_TOOL {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return ToolResult::error(&call.id, format!("unknown tool: {}", call.name));
        }

        let args: ShellArgs = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => return ToolResult::error(&call.id, format!("invalid input: {}", e)),
        };
        if args.command.trim().is_empty() {
            return ToolResult::error(&call.id, "invalid input: command is empty");
        }

        match self.sandbox.run(cancel, &args.command).await {
            Ok(output) => ToolResult::success(&call.id, output),
            Err(e) => ToolResult::error(&call.id, format!("Error: {}\nOutput: {}", e, e.output())),
        }
    }
}
