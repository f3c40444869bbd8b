//! Shared CLI helpers used across multiple command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use petclaw::agent::Orchestrator;
use petclaw::config::Config;
use petclaw::pet::{DaemonLock, StateStore};
use petclaw::providers::{build_provider, select_backend};
use petclaw::sandbox::CommandSandbox;

/// Load configuration from `path`, or the default location.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Config::load().with_context(|| "Failed to load configuration"),
    }
}

/// Load the saved pet, or start an unnamed one when nothing is on disk yet.
pub(crate) fn load_state(config: &Config) -> Result<Arc<StateStore>> {
    let path = config.state_path();
    let state = StateStore::load(&path)
        .with_context(|| format!("Failed to load pet state from {}", path.display()))?;

    Ok(Arc::new(state.unwrap_or_else(|| {
        info!(path = %path.display(), "No saved pet found, starting fresh");
        StateStore::new("", "")
    })))
}

/// Load the pet for a command that changes it. Refuses while a daemon owns
/// the state file, since its next save would overwrite the change.
pub(crate) fn load_state_for_update(config: &Config) -> Result<Arc<StateStore>> {
    let path = config.state_path();
    let holder = DaemonLock::holder(&path)
        .with_context(|| format!("Failed to check the daemon lock for {}", path.display()))?;
    if let Some(pid) = holder {
        anyhow::bail!(
            "The petclaw daemon (pid {}) owns {}. Stop it before changing the pet \
             from another process.",
            pid,
            path.display()
        );
    }
    load_state(config)
}

pub(crate) fn save_state(config: &Config, state: &StateStore) -> Result<()> {
    let path = config.state_path();
    state
        .save(&path)
        .with_context(|| format!("Failed to save pet state to {}", path.display()))
}

/// Wire the dialogue core. Fails with setup guidance when no provider has
/// a key.
pub(crate) fn create_orchestrator(config: &Config, state: Arc<StateStore>) -> Result<Orchestrator> {
    let Some(provider) = build_provider(config) else {
        anyhow::bail!(
            "No AI provider configured. Set ANTHROPIC_API_KEY, GOOGLE_API_KEY or \
             OPENAI_API_KEY, or add a key to {}",
            Config::path().display()
        );
    };

    let sandbox = Arc::new(CommandSandbox::from_config(&config.shell));
    let mut orchestrator = Orchestrator::from_config(config, provider, sandbox, state);
    if let Some(personality) = &config.pet.personality {
        orchestrator = orchestrator.with_personality(personality);
    }

    info!(
        provider = orchestrator.provider_name(),
        backend = select_backend(config).map(|b| b.as_str()).unwrap_or("none"),
        "Orchestrator ready"
    );
    Ok(orchestrator)
}

/// Text-mode progress bar, `width` cells wide.
pub(crate) fn progress_bar(value: f64, width: usize) -> String {
    let filled = ((value.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "{}{} {:>3.0}",
        "█".repeat(filled),
        "░".repeat(width - filled),
        value
    )
}

/// Display name, falling back when the pet has not been named.
pub(crate) fn display_name(state: &StateStore) -> String {
    let name = state.snapshot().name;
    if name.is_empty() {
        "Your pet".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.pet.state_path = dir.path().join("state.json").display().to_string();
        config
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 10), "░░░░░░░░░░   0");
        assert_eq!(progress_bar(50.0, 10), "█████░░░░░  50");
        assert_eq!(progress_bar(100.0, 4), "████ 100");
    }

    #[test]
    fn test_load_state_fresh_then_saved() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let state = load_state(&config).unwrap();
        assert!(!state.is_onboarded());
        assert_eq!(display_name(&state), "Your pet");

        state.set_identity("Inky", "octopus");
        save_state(&config, &state).unwrap();

        let reloaded = load_state(&config).unwrap();
        assert!(reloaded.is_onboarded());
        assert_eq!(display_name(&reloaded), "Inky");
    }

    #[test]
    fn test_load_state_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(config.state_path(), "{not json").unwrap();
        let err = load_state(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to load pet state"));
    }

    #[test]
    fn test_update_refused_while_daemon_holds_state() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let daemon_state = load_state(&config).unwrap();
        save_state(&config, &daemon_state).unwrap();

        let lock = DaemonLock::acquire(&config.state_path()).unwrap();
        let Err(err) = load_state_for_update(&config) else {
            panic!("expected the daemon lock to refuse the update");
        };
        assert!(err.to_string().contains("petclaw daemon"));
        assert!(load_state(&config).is_ok());

        drop(lock);
        let state = load_state_for_update(&config).unwrap();
        state.feed();
        save_state(&config, &state).unwrap();
        let reloaded = load_state(&config).unwrap();
        assert_eq!(reloaded.record().hunger, state.record().hunger);
    }

    #[test]
    fn test_orchestrator_requires_provider() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let Err(err) = create_orchestrator(&config, state) else {
            panic!("expected missing provider error");
        };
        assert!(err.to_string().contains("No AI provider configured"));
    }
}
