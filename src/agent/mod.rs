//! Agent module - the dialogue orchestration core
//!
//! ```text
//! caller ──> Orchestrator::ask ──> RateLimiter::allow
//!                  │
//!                  ├──> StateStore::snapshot ──> system prompt
//!                  │
//!                  └──> Provider::send <──┐
//!                           │             │ tool results
//!                           ▼             │
//!                    CommandSandbox::run ─┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use petclaw::agent::Orchestrator;
//! use petclaw::config::Config;
//! use petclaw::pet::StateStore;
//! use petclaw::providers::build_provider;
//! use petclaw::sandbox::CommandSandbox;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() {
//!     let config = Config::load().unwrap();
//!     let state = Arc::new(StateStore::new("Inky", "octopus"));
//!     let sandbox = Arc::new(CommandSandbox::from_config(&config.shell));
//!     let Some(provider) = build_provider(&config) else { return };
//!     let orch = Orchestrator::from_config(&config, provider, sandbox, state);
//!     let reply = orch.ask(&CancellationToken::new(), "How are you?").await.unwrap();
//!     println!("{}", reply);
//! }
//! ```

pub mod orchestrator;
pub mod prompt;
pub mod rate_limit;

pub use orchestrator::{Orchestrator, CARRIED_AWAY_REPLY, RATE_LIMITED_REPLY};
pub use prompt::build_system_prompt;
pub use rate_limit::RateLimiter;
