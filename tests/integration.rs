//! End-to-end tests through the public API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use petclaw::agent::{Orchestrator, RateLimiter, RATE_LIMITED_REPLY};
use petclaw::config::{Config, ShellConfig};
use petclaw::pet::{DaemonLock, Mood, StateStore, SystemStats};
use petclaw::services::PersistService;
use petclaw::providers::{ConversationTurn, Provider, Response, ToolCall};
use petclaw::sandbox::{CommandSandbox, SandboxError};
use petclaw::{PetError, Result};

// ============================================================================
// Test provider
// ============================================================================

/// Replays canned responses and records every history it was sent.
#[derive(Default)]
struct ReplayProvider {
    replies: Mutex<VecDeque<Response>>,
    histories: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ReplayProvider {
    fn new(replies: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            histories: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Provider for ReplayProvider {
    async fn send(&self, _system_prompt: &str, history: &[ConversationTurn]) -> Result<Response> {
        self.histories.lock().unwrap().push(history.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Response::text("(out of script)")))
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn model(&self) -> &str {
        "replay-1"
    }
}

fn shell_call(id: &str, command: &str) -> ToolCall {
    ToolCall::new(id, "run_shell", &serde_json::json!({ "command": command }).to_string())
}

fn orchestrator(provider: Arc<ReplayProvider>, state: Arc<StateStore>, rate_limit: u32) -> Orchestrator {
    let sandbox = Arc::new(CommandSandbox::from_config(&ShellConfig::default()));
    Orchestrator::new(
        provider,
        sandbox,
        state,
        RateLimiter::new(rate_limit, Duration::from_secs(60)),
        5,
    )
}

// ============================================================================
// Dialogue
// ============================================================================

#[tokio::test]
async fn test_tool_loop_runs_real_command() {
    let provider = ReplayProvider::new(vec![
        Response::with_tools("Let me look.", vec![shell_call("c1", "echo pet-says-hi")]),
        Response::text("The host said hi back!"),
    ]);
    let state = Arc::new(StateStore::new("Inky", "octopus"));
    let orch = orchestrator(Arc::clone(&provider), state, 10);

    let reply = orch
        .ask(&CancellationToken::new(), "say hi to the host")
        .await
        .unwrap();
    assert_eq!(reply, "The host said hi back!");

    let histories = provider.histories.lock().unwrap();
    assert_eq!(histories.len(), 2);
    let last = histories[1].last().unwrap();
    assert!(last.has_tool_results());
    let result = &last.results()[0];
    assert_eq!(result.id, "c1");
    assert!(!result.is_error);
    assert!(result.content.contains("pet-says-hi"));
}

#[tokio::test]
async fn test_blocked_command_reported_to_model() {
    let provider = ReplayProvider::new(vec![
        Response::with_tools("", vec![shell_call("c1", "sudo shutdown now")]),
        Response::text("I won't do that."),
    ]);
    let state = Arc::new(StateStore::new("Inky", "octopus"));
    let orch = orchestrator(Arc::clone(&provider), state, 10);

    let reply = orch.ask(&CancellationToken::new(), "turn it off").await.unwrap();
    assert_eq!(reply, "I won't do that.");

    let histories = provider.histories.lock().unwrap();
    let result = &histories[1].last().unwrap().results()[0];
    assert!(result.is_error);
    assert!(result.content.contains("blocked"));
}

#[tokio::test]
async fn test_rate_limit_declines_without_calling_provider() {
    let provider = ReplayProvider::new(vec![Response::text("one")]);
    let state = Arc::new(StateStore::new("Inky", "octopus"));
    let orch = orchestrator(Arc::clone(&provider), state, 1);

    let cancel = CancellationToken::new();
    assert_eq!(orch.ask(&cancel, "first").await.unwrap(), "one");
    assert_eq!(orch.ask(&cancel, "second").await.unwrap(), RATE_LIMITED_REPLY);
    assert_eq!(provider.histories.lock().unwrap().len(), 1);
}

// ============================================================================
// Sandbox
// ============================================================================

#[tokio::test]
async fn test_sandbox_limits() {
    let sandbox = CommandSandbox::from_config(&ShellConfig {
        timeout_secs: 1,
        max_output_bytes: 16,
        extra_blocked_patterns: vec!["curl ".into()],
    });
    let cancel = CancellationToken::new();

    assert!(matches!(
        sandbox.run(&cancel, "rm -rf /").await,
        Err(SandboxError::Blocked { .. })
    ));
    assert!(matches!(
        sandbox.run(&cancel, "CURL http://example.com").await,
        Err(SandboxError::Blocked { .. })
    ));
    assert!(matches!(
        sandbox.run(&cancel, "sleep 5").await,
        Err(SandboxError::Timeout { .. })
    ));

    let output = sandbox.run(&cancel, "printf '%040d' 0").await.unwrap();
    assert!(output.starts_with("0000000000000000\n"));
    assert!(output.ends_with("[output truncated]"));
}

// ============================================================================
// State lifecycle and persistence
// ============================================================================

#[test]
fn test_lifecycle_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pet").join("state.json");

    assert!(StateStore::load(&path).unwrap().is_none());

    let state = StateStore::new("Inky", "octopus");
    let critical = SystemStats {
        cpu_percent: 97.0,
        mem_percent: 96.0,
        disk_percent: 40.0,
        temp_c: 50.0,
        uptime_days: 7.0,
    };
    state.apply_system_stats(critical);
    assert!(!state.is_alive());
    assert_eq!(state.snapshot().mood, Mood::Dead);
    state.save(&path).unwrap();

    let restored = StateStore::load(&path).unwrap().unwrap();
    assert!(!restored.is_alive());
    assert_eq!(restored.snapshot().name, "Inky");

    restored.revive();
    let snap = restored.snapshot();
    assert!(snap.is_alive);
    assert_eq!(snap.hunger, 20.0);
    assert_ne!(snap.mood, Mood::Dead);
}

#[tokio::test]
async fn test_daemon_owns_state_while_running() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    StateStore::new("Inky", "octopus").save(&path).unwrap();

    let lock = DaemonLock::acquire(&path).unwrap();
    let daemon_state = Arc::new(StateStore::load(&path).unwrap().unwrap());
    let persist = PersistService::new(Arc::clone(&daemon_state), path.clone(), 1);
    let shutdown = CancellationToken::new();
    let handle = persist.start(shutdown.clone());

    // Another process sees the owner and must not write behind its back.
    assert_eq!(DaemonLock::holder(&path).unwrap(), Some(std::process::id()));
    assert!(matches!(
        DaemonLock::acquire(&path),
        Err(PetError::StateLocked { .. })
    ));

    daemon_state.feed();
    shutdown.cancel();
    handle.await.unwrap();
    drop(lock);

    assert_eq!(DaemonLock::holder(&path).unwrap(), None);
    let restored = StateStore::load(&path).unwrap().unwrap();
    assert_eq!(restored.record().hunger, daemon_state.record().hunger);
}

#[test]
fn test_config_file_and_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(
        &path,
        r#"{"pet": {"save_interval_secs": 60}, "monitor": {"interval_secs": 15}}"#,
    )
    .unwrap();
    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.pet.save_interval_secs, 60);
    assert_eq!(config.monitor.interval_secs, 15);
    assert_eq!(config.ai.max_tool_iterations, 5);

    std::fs::write(&path, r#"{"shell": {"max_output_bytes": 0}}"#).unwrap();
    assert!(Config::load_from_path(&path).is_err());
}
