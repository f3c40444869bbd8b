//! Types shared by process runtimes.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a runtime can hit before or while supervising a process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("failed to spawn process: {0}")]
    Spawn(String),
    #[error("failed to wait for process: {0}")]
    Wait(String),
}

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Bounds applied to a single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    /// Hard deadline; the process is killed when it passes
    pub timeout: Duration,
    /// Capture at most this many bytes of combined stdout/stderr
    pub max_output_bytes: usize,
}

/// How the process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own. `None` when terminated by a signal.
    Exited(Option<i32>),
    TimedOut,
    Cancelled,
}

/// Captured result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout and stderr interleaved in arrival order, at most the cap
    pub combined: Vec<u8>,
    /// Output past the cap was discarded
    pub truncated: bool,
    pub termination: Termination,
}

impl CommandOutput {
    pub fn new(combined: Vec<u8>, termination: Termination) -> Self {
        Self {
            combined,
            truncated: false,
            termination,
        }
    }

    pub fn success(&self) -> bool {
        self.termination == Termination::Exited(Some(0))
    }
}

/// Something that can run a shell command string.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `command` through the shell, honouring `limits` and `cancel`.
    ///
    /// Timeout and cancellation are reported through
    /// [`CommandOutput::termination`], never as errors, so partial output
    /// survives.
    async fn execute(
        &self,
        command: &str,
        limits: &ExecLimits,
        cancel: &CancellationToken,
    ) -> RuntimeResult<CommandOutput>;
}
