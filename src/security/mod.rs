//! Security module for PetClaw
//!
//! Command filtering applied before the sandbox spawns anything.

pub mod shell;

pub use shell::{ShellSecurityConfig, DEFAULT_BLOCKED_PATTERNS};
