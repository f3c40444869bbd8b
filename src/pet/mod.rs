//! The virtual pet: vitals, mood and persistence.

pub mod lock;
pub mod mood;
pub mod state;

pub use lock::DaemonLock;
pub use mood::{determine_mood, distress_reason, Mood};
pub use state::{PetRecord, Snapshot, StateStore, SystemStats};
