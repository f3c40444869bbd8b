//! Daemon: long-running telemetry and persistence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use petclaw::pet::DaemonLock;
use petclaw::services::{JsonFileMetrics, PersistService, TelemetryService, TickOutcome};
use petclaw::PetError;

use super::common::{display_name, load_config, load_state, load_state_for_update, save_state};

/// Apply one metrics file to the pet and save.
pub(crate) async fn cmd_sample(config_path: Option<&Path>, metrics: PathBuf) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    let telemetry = TelemetryService::new(
        Arc::new(JsonFileMetrics::new(&metrics)),
        Arc::clone(&state),
        config.monitor.interval_secs,
    );

    let outcome = telemetry
        .trigger_now()
        .await
        .with_context(|| format!("Failed to read metrics from {}", metrics.display()))?;
    save_state(&config, &state)?;

    let name = display_name(&state);
    match outcome {
        TickOutcome::Applied { distress: Some(line) } => println!("{}: {}", name, line),
        TickOutcome::Applied { distress: None } => println!("{} is {}.", name, state.snapshot().mood),
        TickOutcome::Died => println!("{} has passed away... The host was under too much stress.", name),
        TickOutcome::Dead => println!("{} is still dead. Use `petclaw revive`.", name),
    }
    Ok(())
}

/// CLI entry point for `petclaw daemon`.
pub(crate) async fn cmd_daemon(config_path: Option<&Path>, metrics_file: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let state_path = config.state_path();
    let _lock = match DaemonLock::acquire(&state_path) {
        Ok(lock) => lock,
        Err(PetError::StateLocked { pid }) => {
            anyhow::bail!("Another petclaw daemon (pid {}) is already running", pid)
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to lock pet state at {}", state_path.display())
            })
        }
    };
    let state = load_state(&config)?;

    println!("Starting PetClaw daemon for {}...", display_name(&state));

    let shutdown = CancellationToken::new();
    let persist = PersistService::new(
        Arc::clone(&state),
        config.state_path(),
        config.pet.save_interval_secs,
    );
    let persist_handle = persist.start(shutdown.clone());

    let telemetry_handle = match metrics_file {
        Some(path) => {
            let telemetry = TelemetryService::new(
                Arc::new(JsonFileMetrics::new(path)),
                Arc::clone(&state),
                config.monitor.interval_secs,
            );
            Some(telemetry.start(shutdown.clone()))
        }
        None => {
            warn!("No metrics file given; vitals will only change through care commands");
            None
        }
    };

    tokio::signal::ctrl_c()
        .await
        .with_context(|| "Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");
    shutdown.cancel();

    if let Some(handle) = telemetry_handle {
        handle.await.with_context(|| "Telemetry task panicked")?;
    }
    persist_handle
        .await
        .with_context(|| "Persist task panicked")?;

    if !persist.is_healthy() {
        anyhow::bail!(
            "Pet state could not be saved to {} ({} consecutive failures)",
            persist.path().display(),
            persist.consecutive_failures()
        );
    }
    println!("Daemon stopped.");
    Ok(())
}
