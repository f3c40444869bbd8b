//! Native runtime implementation
//!
//! Executes commands directly on the host with `sh -c`, capturing stdout and
//! stderr into one capped buffer while enforcing a deadline and honouring
//! cancellation.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{
    CommandOutput, ExecLimits, ProcessRuntime, RuntimeError, RuntimeResult, Termination,
};

/// How long to keep draining pipes once the shell itself is gone.
/// Background children left behind by a normal exit can hold them open.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Native runtime that executes commands directly on the host
#[derive(Debug, Clone, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a new native runtime
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Default)]
struct CappedBuffer {
    bytes: Vec<u8>,
    cap: usize,
    overflowed: bool,
}

impl CappedBuffer {
    fn push(&mut self, chunk: &[u8]) {
        let room = self.cap.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.overflowed = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// Copy a pipe into the shared buffer until EOF. Keeps reading past the cap
/// so the child never blocks on a full pipe.
fn pump<R>(mut reader: R, buf: Arc<Mutex<CappedBuffer>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(&chunk[..n]),
            }
        }
    })
}

/// Kill every process in the command's group, then reap the shell.
async fn kill_group(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            // SAFETY: killpg only sends a signal. The group was created for this
            // child by `process_group(0)`, so it holds nothing but the command.
            unsafe {
                libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
    let _ = child.kill().await;
}

async fn drain(readers: Vec<JoinHandle<()>>) {
    for mut reader in readers {
        if tokio::time::timeout(PIPE_DRAIN_GRACE, &mut reader)
            .await
            .is_err()
        {
            reader.abort();
        }
    }
}

#[async_trait]
impl ProcessRuntime for NativeRuntime {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn execute(
        &self,
        command: &str,
        limits: &ExecLimits,
        cancel: &CancellationToken,
    ) -> RuntimeResult<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Spawn(e.to_string()))?;
        let pgid = child.id();

        let buf = Arc::new(Mutex::new(CappedBuffer {
            cap: limits.max_output_bytes,
            ..Default::default()
        }));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(pump(stdout, Arc::clone(&buf)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(pump(stderr, Arc::clone(&buf)));
        }

        let termination = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| RuntimeError::Wait(e.to_string()))?;
                Termination::Exited(status.code())
            }
            _ = tokio::time::sleep(limits.timeout) => {
                debug!(command = %command, "Deadline passed, killing process group");
                kill_group(&mut child, pgid).await;
                Termination::TimedOut
            }
            _ = cancel.cancelled() => {
                debug!(command = %command, "Cancelled, killing process group");
                kill_group(&mut child, pgid).await;
                Termination::Cancelled
            }
        };

        drain(readers).await;

        let mut captured = buf.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(CommandOutput {
            combined: std::mem::take(&mut captured.bytes),
            truncated: captured.overflowed,
            termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(timeout_ms: u64, cap: usize) -> ExecLimits {
        ExecLimits {
            timeout: Duration::from_millis(timeout_ms),
            max_output_bytes: cap,
        }
    }

    async fn run(command: &str, limits: ExecLimits) -> CommandOutput {
        NativeRuntime::new()
            .execute(command, &limits, &CancellationToken::new())
            .await
            .unwrap()
    }

    /// Whether `pid` is a live process. Zombies count as gone.
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    async fn background_pid_after(
        command_tail: &str,
        cancel: &CancellationToken,
        timeout_ms: u64,
    ) -> (Termination, u32) {
        let dir = tempfile::TempDir::new().unwrap();
        let pidfile = dir.path().join("bg.pid");
        let command = format!("sleep 30 & echo $! > {}; {}", pidfile.display(), command_tail);

        let output = NativeRuntime::new()
            .execute(&command, &limits(timeout_ms, 1024), cancel)
            .await
            .unwrap();
        let pid = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        (output.termination, pid)
    }

    #[test]
    fn test_native_runtime_name() {
        assert_eq!(NativeRuntime::new().name(), "native");
    }

    #[test]
    fn test_capped_buffer() {
        let mut buf = CappedBuffer {
            cap: 4,
            ..Default::default()
        };
        buf.push(b"ab");
        assert!(!buf.overflowed);
        buf.push(b"cdef");
        buf.push(b"gh");
        assert_eq!(buf.bytes, b"abcd");
        assert!(buf.overflowed);
    }

    #[tokio::test]
    async fn test_native_runtime_echo() {
        let output = run("echo hello", limits(5000, 1024)).await;
        assert!(output.success());
        assert_eq!(String::from_utf8_lossy(&output.combined).trim(), "hello");
        assert!(!output.truncated);
    }

    #[tokio::test]
    async fn test_native_runtime_combines_stderr() {
        let output = run("echo out; echo err >&2", limits(5000, 1024)).await;
        let text = String::from_utf8_lossy(&output.combined);
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[tokio::test]
    async fn test_native_runtime_exit_code() {
        let output = run("exit 42", limits(5000, 1024)).await;
        assert!(!output.success());
        assert_eq!(output.termination, Termination::Exited(Some(42)));
    }

    #[tokio::test]
    async fn test_native_runtime_cap() {
        let output = run("printf '%050d' 0", limits(5000, 10)).await;
        assert_eq!(output.combined, b"0000000000");
        assert!(output.truncated);
    }

    #[tokio::test]
    async fn test_native_runtime_timeout_keeps_partial_output() {
        let started = std::time::Instant::now();
        let output = run("echo early; sleep 10", limits(300, 1024)).await;
        assert_eq!(output.termination, Termination::TimedOut);
        assert!(String::from_utf8_lossy(&output.combined).contains("early"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_native_runtime_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let output = NativeRuntime::new()
            .execute("sleep 10", &limits(10_000, 1024), &cancel)
            .await
            .unwrap();
        assert_eq!(output.termination, Termination::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let (termination, pid) =
            background_pid_after("wait", &CancellationToken::new(), 500).await;
        assert_eq!(termination, Termination::TimedOut);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!is_running(pid), "background pid {} outlived the deadline", pid);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_cancel_kills_background_children() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let (termination, pid) = background_pid_after("wait", &cancel, 10_000).await;
        assert_eq!(termination, Termination::Cancelled);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!is_running(pid), "background pid {} outlived cancellation", pid);
    }
}
