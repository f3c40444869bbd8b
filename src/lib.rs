//! PetClaw - a companion creature that lives on its host
//!
//! Host telemetry becomes the pet's vitals and mood; conversation runs
//! through a provider-agnostic tool-use loop whose only tool is a sandboxed
//! shell.
//!
//! ```
//! use petclaw::config::ShellConfig;
//! use petclaw::sandbox::{CommandSandbox, SandboxError};
//! use tokio_util::sync::CancellationToken;
//!
//! let sandbox = CommandSandbox::from_config(&ShellConfig::default());
//! let result = tokio_test::block_on(sandbox.run(&CancellationToken::new(), "rm -rf /"));
//! assert!(matches!(result, Err(SandboxError::Blocked { .. })));
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod pet;
pub mod providers;
pub mod runtime;
pub mod sandbox;
pub mod security;
pub mod services;
pub mod utils;

pub use agent::{Orchestrator, RateLimiter};
pub use config::Config;
pub use error::{PetError, ProviderError, Result};
pub use pet::{Mood, Snapshot, StateStore, SystemStats};
pub use providers::{build_provider, ConversationTurn, Provider, Response, ToolCall, ToolResult};
pub use sandbox::{CommandSandbox, SandboxError};
