//! Telemetry service: folds host metrics into the pet on a fixed cadence.
//!
//! The crate does not sample the host itself. A [`MetricsSource`] hands over
//! plain [`SystemStats`]; [`JsonFileMetrics`] reads them from a file kept
//! current by an external sampler.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::pet::{distress_reason, StateStore, SystemStats};

/// Something that can produce a current metrics sample.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> Result<SystemStats>;

    fn name(&self) -> &str;
}

/// Reads a JSON-encoded [`SystemStats`] from a file on every sample.
///
/// Missing fields default to zero.
pub struct JsonFileMetrics {
    path: PathBuf,
}

impl JsonFileMetrics {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsSource for JsonFileMetrics {
    async fn sample(&self) -> Result<SystemStats> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let stats: SystemStats = serde_json::from_str(&content)?;
        Ok(stats)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// What one telemetry tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Stats applied; carries the distress line, if any.
    Applied { distress: Option<&'static str> },
    /// Stats applied and the pet died on this tick.
    Died,
    /// The pet is already dead; stats were recorded but nothing else.
    Dead,
}

/// Background service that samples a [`MetricsSource`] and applies each
/// sample to the [`StateStore`].
pub struct TelemetryService {
    source: Arc<dyn MetricsSource>,
    state: Arc<StateStore>,
    interval: Duration,
    /// Count of consecutive failed samples.
    pub(crate) consecutive_failures: Arc<AtomicU32>,
    failure_alert_threshold: u32,
}

impl TelemetryService {
    pub fn new(source: Arc<dyn MetricsSource>, state: Arc<StateStore>, interval_secs: u64) -> Self {
        Self {
            source,
            state,
            interval: Duration::from_secs(interval_secs.max(1)),
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            failure_alert_threshold: 3,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the sampling loop; it runs until `shutdown` is cancelled.
    pub fn start(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let interval = self.interval;
        let failures = Arc::clone(&self.consecutive_failures);
        let threshold = self.failure_alert_threshold;

        crate::log_component!(
            info,
            "telemetry",
            "Service started",
            interval_secs = interval.as_secs(),
            source = source.name()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match Self::tick(source.as_ref(), &state).await {
                    Ok(_) => failures.store(0, Ordering::Relaxed),
                    Err(e) => {
                        error!("Telemetry sample from {} failed: {}", source.name(), e);
                        let count = failures.fetch_add(1, Ordering::Relaxed) + 1;
                        if count >= threshold {
                            warn!(
                                consecutive_failures = count,
                                "Telemetry: {} consecutive failures, vitals are stale", count
                            );
                        }
                    }
                }
            }
            crate::log_component!(info, "telemetry", "Service stopped");
        })
    }

    /// Sample once and apply the result immediately.
    pub async fn trigger_now(&self) -> Result<TickOutcome> {
        Self::tick(self.source.as_ref(), &self.state).await
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures() < self.failure_alert_threshold
    }

    async fn tick(source: &dyn MetricsSource, state: &StateStore) -> Result<TickOutcome> {
        let stats = source.sample().await?;

        let was_alive = state.is_alive();
        state.apply_system_stats(stats);
        let snap = state.snapshot();

        debug!(
            cpu = stats.cpu_percent,
            mem = stats.mem_percent,
            mood = %snap.mood,
            "Telemetry applied"
        );

        if !snap.is_alive {
            if was_alive {
                return Ok(TickOutcome::Died);
            }
            return Ok(TickOutcome::Dead);
        }

        let distress = distress_reason(&snap);
        if let Some(line) = distress {
            warn!(pet = %snap.name, "{}", line);
        }
        Ok(TickOutcome::Applied { distress })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PetError;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedMetrics {
        stats: Mutex<SystemStats>,
        calls: AtomicU32,
    }

    impl FixedMetrics {
        fn new(stats: SystemStats) -> Self {
            Self {
                stats: Mutex::new(stats),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsSource for FixedMetrics {
        async fn sample(&self) -> Result<SystemStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(*self.stats.lock().unwrap())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenMetrics;

    #[async_trait]
    impl MetricsSource for BrokenMetrics {
        async fn sample(&self) -> Result<SystemStats> {
            Err(PetError::Config("sampler offline".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn calm() -> SystemStats {
        SystemStats {
            cpu_percent: 10.0,
            mem_percent: 30.0,
            disk_percent: 40.0,
            temp_c: 45.0,
            uptime_days: 1.0,
        }
    }

    #[tokio::test]
    async fn test_trigger_applies_stats() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let source = Arc::new(FixedMetrics::new(calm()));
        let service = TelemetryService::new(source, Arc::clone(&state), 30);

        let outcome = service.trigger_now().await.unwrap();
        assert_eq!(outcome, TickOutcome::Applied { distress: None });

        let snap = state.snapshot();
        assert_eq!(snap.cpu_percent, 10.0);
        assert_eq!(snap.hunger, 10.0);
        assert_eq!(snap.cleanliness, 60.0);
    }

    #[tokio::test]
    async fn test_distress_reported() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let mut stats = calm();
        stats.mem_percent = 93.0;
        let service = TelemetryService::new(Arc::new(FixedMetrics::new(stats)), state, 30);

        match service.trigger_now().await.unwrap() {
            TickOutcome::Applied { distress } => assert!(distress.is_some()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_death_reported_once() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let stats = SystemStats {
            cpu_percent: 99.0,
            mem_percent: 99.0,
            disk_percent: 50.0,
            temp_c: 60.0,
            uptime_days: 10.0,
        };
        let service = TelemetryService::new(Arc::new(FixedMetrics::new(stats)), Arc::clone(&state), 30);

        assert_eq!(service.trigger_now().await.unwrap(), TickOutcome::Died);
        assert_eq!(service.trigger_now().await.unwrap(), TickOutcome::Dead);
        assert!(!state.is_alive());
    }

    #[tokio::test]
    async fn test_loop_samples_until_shutdown() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let source = Arc::new(FixedMetrics::new(calm()));
        let service = TelemetryService::new(Arc::clone(&source) as Arc<dyn MetricsSource>, state, 1);

        let shutdown = CancellationToken::new();
        let handle = service.start(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // The first tick of a tokio interval completes immediately.
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(service.is_healthy());
    }

    #[tokio::test]
    async fn test_failures_do_not_touch_state() {
        let state = Arc::new(StateStore::new("Inky", "octopus"));
        let before = state.record();
        let service = TelemetryService::new(Arc::new(BrokenMetrics), Arc::clone(&state), 1);

        assert!(service.trigger_now().await.is_err());
        assert_eq!(state.record().cpu_percent, before.cpu_percent);
        assert_eq!(state.record().hunger, before.hunger);
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, r#"{"cpu_percent": 55.5, "mem_percent": 20}"#).unwrap();

        let stats = JsonFileMetrics::new(&path).sample().await.unwrap();
        assert_eq!(stats.cpu_percent, 55.5);
        assert_eq!(stats.mem_percent, 20.0);
        assert_eq!(stats.uptime_days, 0.0);

        let missing = JsonFileMetrics::new(dir.path().join("nope.json"));
        assert!(missing.sample().await.is_err());
    }
}
