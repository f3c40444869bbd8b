//! Command sandbox
//!
//! Runs one model-requested shell command under three constraints: the
//! deny-list in [`crate::security::shell`], a hard deadline and an output
//! cap. Failures are returned as [`SandboxError`] values that the
//! orchestrator turns into error-flagged tool results; none of them abort a
//! dialogue.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ShellConfig;
use crate::runtime::{CommandOutput, ExecLimits, NativeRuntime, ProcessRuntime, Termination};
use crate::security::ShellSecurityConfig;

/// Appended to output that hit the size cap.
pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

/// Why a sandboxed command did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    /// Matched the deny-list; nothing was spawned
    #[error("command blocked: contains prohibited pattern '{pattern}'")]
    Blocked { pattern: String },

    #[error("command timed out after {after:?}")]
    Timeout { after: Duration, output: String },

    /// Non-zero exit. `exit_code` is `None` when killed by a signal.
    #[error("{}", failed_message(.exit_code))]
    Failed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("command cancelled")]
    Cancelled { output: String },

    #[error("{0}")]
    Spawn(String),
}

fn failed_message(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("command exited with status {}", code),
        None => "command terminated by signal".to_string(),
    }
}

impl SandboxError {
    /// Whatever the command printed before it failed.
    pub fn output(&self) -> &str {
        match self {
            SandboxError::Timeout { output, .. }
            | SandboxError::Failed { output, .. }
            | SandboxError::Cancelled { output } => output,
            SandboxError::Blocked { .. } | SandboxError::Spawn(_) => "",
        }
    }
}

/// Executes shell commands on behalf of the model.
///
/// Stateless between runs; share it freely behind an `Arc`.
pub struct CommandSandbox {
    security: ShellSecurityConfig,
    runtime: Arc<dyn ProcessRuntime>,
    limits: ExecLimits,
}

impl CommandSandbox {
    /// Native runtime, built-in deny-list plus the configured extras.
    pub fn from_config(config: &ShellConfig) -> Self {
        Self::with_runtime(
            ShellSecurityConfig::with_extra_patterns(&config.extra_blocked_patterns),
            Arc::new(NativeRuntime::new()),
            Duration::from_secs(config.timeout_secs),
            config.max_output_bytes,
        )
    }

    pub fn with_runtime(
        security: ShellSecurityConfig,
        runtime: Arc<dyn ProcessRuntime>,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            security,
            runtime,
            limits: ExecLimits {
                timeout,
                max_output_bytes,
            },
        }
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime.name()
    }

    pub fn timeout(&self) -> Duration {
        self.limits.timeout
    }

    /// Screen, execute and capture one command.
    ///
    /// Returns the combined output on exit status 0. Output over the cap is
    /// cut and marked in both the success and the error cases.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
    ) -> Result<String, SandboxError> {
        if let Some(pattern) = self.security.find_blocked(command) {
            warn!(command = %command, pattern = %pattern, "Blocked shell command");
            return Err(SandboxError::Blocked {
                pattern: pattern.to_string(),
            });
        }

        info!(command = %command, runtime = self.runtime.name(), "Executing shell command");
        let captured = self
            .runtime
            .execute(command, &self.limits, cancel)
            .await
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;

        let output = render(&captured, self.limits.max_output_bytes);
        match captured.termination {
            Termination::Exited(Some(0)) => Ok(output),
            Termination::Exited(exit_code) => Err(SandboxError::Failed { exit_code, output }),
            Termination::TimedOut => {
                warn!(command = %command, after = ?self.limits.timeout, "Shell command timed out");
                Err(SandboxError::Timeout {
                    after: self.limits.timeout,
                    output,
                })
            }
            Termination::Cancelled => Err(SandboxError::Cancelled { output }),
        }
    }
}

/// Decode captured bytes, enforcing the cap and appending the marker.
fn render(captured: &CommandOutput, cap: usize) -> String {
    let over = captured.combined.len() > cap;
    let kept = &captured.combined[..captured.combined.len().min(cap)];
    let mut text = String::from_utf8_lossy(kept).into_owned();
    if over || captured.truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}
