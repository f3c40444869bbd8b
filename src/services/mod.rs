//! Long-running background services used by daemon mode.

pub mod persist;
pub mod telemetry;

pub use persist::PersistService;
pub use telemetry::{JsonFileMetrics, MetricsSource, TelemetryService, TickOutcome};
