//! Process runtime module for PetClaw
//!
//! The sandbox delegates the actual spawning to a [`ProcessRuntime`]. Only
//! the native backend ships; tests substitute a mock.

pub mod native;
pub mod types;

pub use native::NativeRuntime;
pub use types::{
    CommandOutput, ExecLimits, ProcessRuntime, RuntimeError, RuntimeResult, Termination,
};

#[cfg(test)]
pub use types::MockProcessRuntime;
