//! Periodic state persistence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::{PetError, Result};
use crate::pet::StateStore;

/// Background service that writes the pet record to disk on a fixed
/// interval, and once more when shut down.
pub struct PersistService {
    state: Arc<StateStore>,
    path: PathBuf,
    interval: Duration,
    /// Count of consecutive failed saves.
    pub(crate) consecutive_failures: Arc<AtomicU32>,
    /// Threshold before warning about repeated failures.
    failure_alert_threshold: u32,
}

impl PersistService {
    pub fn new(state: Arc<StateStore>, path: PathBuf, interval_secs: u64) -> Self {
        Self {
            state,
            path,
            interval: Duration::from_secs(interval_secs.max(1)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            failure_alert_threshold: 3,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the save loop. It exits after a final save once `shutdown`
    /// is cancelled.
    pub fn start(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();
        let interval = self.interval;
        let failures = Arc::clone(&self.consecutive_failures);
        let threshold = self.failure_alert_threshold;

        crate::log_component!(
            info,
            "persist",
            "Service started",
            interval_secs = interval.as_secs(),
            path = tracing::field::display(path.display())
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        Self::tick(&state, &path, &failures, threshold).await;
                    }
                }
            }

            Self::tick(&state, &path, &failures, threshold).await;
            crate::log_component!(info, "persist", "Service stopped");
        })
    }

    /// Save immediately.
    pub fn save_now(&self) -> Result<()> {
        self.state.save(&self.path)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Returns true if the service is healthy (fewer failures than the alert threshold).
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures() < self.failure_alert_threshold
    }

    /// Save on the blocking pool, counting consecutive failures.
    async fn tick(state: &Arc<StateStore>, path: &Path, failures: &AtomicU32, threshold: u32) {
        let state = Arc::clone(state);
        let target = path.to_path_buf();
        let saved = tokio::task::spawn_blocking(move || state.save(&target))
            .await
            .unwrap_or_else(|e| Err(PetError::Persistence(format!("save task failed: {e}"))));

        match saved {
            Ok(()) => failures.store(0, Ordering::Relaxed),
            Err(e) => {
                error!("Failed to save pet state to {:?}: {}", path, e);
                let count = failures.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= threshold {
                    warn!(
                        consecutive_failures = count,
                        "Persist: {} consecutive failures, state may be stale on disk", count
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interval_floor() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let service = PersistService::new(state, PathBuf::from("state.json"), 0);
        assert_eq!(service.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_save_now_writes_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let service = PersistService::new(Arc::clone(&state), path.clone(), 300);

        service.save_now().unwrap();
        let loaded = StateStore::load(&path).unwrap().unwrap();
        assert_eq!(loaded.snapshot().name, "Inky");
    }

    #[tokio::test]
    async fn test_saves_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let service = PersistService::new(Arc::clone(&state), path.clone(), 3600);

        let shutdown = CancellationToken::new();
        let handle = service.start(shutdown.clone());
        state.feed();
        shutdown.cancel();
        handle.await.unwrap();

        let loaded = StateStore::load(&path).unwrap().unwrap();
        assert_eq!(loaded.record().hunger, state.record().hunger);
        assert!(service.is_healthy());
    }

    #[tokio::test]
    async fn test_periodic_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let service = PersistService::new(Arc::clone(&state), path.clone(), 1);

        let shutdown = CancellationToken::new();
        let handle = service.start(shutdown.clone());
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(path.exists());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_counted_and_retried() {
        let dir = TempDir::new().unwrap();
        // The parent is a regular file, so every save fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("state.json");

        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let service = PersistService::new(state, path, 3600);
        assert!(service.save_now().is_err());

        for _ in 0..3 {
            PersistService::tick(
                &service.state,
                &service.path,
                &service.consecutive_failures,
                service.failure_alert_threshold,
            )
            .await;
        }
        assert_eq!(service.consecutive_failures(), 3);
        assert!(!service.is_healthy());

        // The loop keeps running; a later successful save resets the count.
        let good = dir.path().join("state.json");
        PersistService::tick(
            &service.state,
            &good,
            &service.consecutive_failures,
            service.failure_alert_threshold,
        )
        .await;
        assert_eq!(service.consecutive_failures(), 0);
    }
}
