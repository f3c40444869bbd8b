//! Configuration management for PetClaw
//!
//! Configuration is loaded from `~/.petclaw/config.json` (a missing file means
//! defaults), then a `.env` file in the working directory, then environment
//! variable overrides. Secrets normally live in the environment.

mod types;
mod validate;

pub use types::*;
pub use validate::validate;

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Config {
    /// Returns the PetClaw configuration directory path (~/.petclaw)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".petclaw")
    }

    /// Returns the path to the config file (~/.petclaw/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// The result is validated before it is returned.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        // Values already in the environment win over the .env file.
        let _ = dotenvy::dotenv();

        config.apply_overrides(|key| std::env::var(key).ok());
        validate(&config)?;
        Ok(config)
    }

    /// Apply environment-style overrides through `lookup`.
    ///
    /// Keys follow `PETCLAW_SECTION_KEY`; provider keys additionally accept
    /// the conventional vendor variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = get("PETCLAW_AI_PROVIDER").or_else(|| get("AI_PROVIDER")) {
            self.ai.provider = Some(val.trim().to_lowercase());
        }
        if let Some(v) = get("PETCLAW_AI_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.ai.max_tokens = v;
        }
        if let Some(v) = get("PETCLAW_AI_MAX_TOOL_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.ai.max_tool_iterations = v;
        }
        if let Some(v) = get("PETCLAW_AI_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.ai.rate_limit = v;
        }
        if let Some(v) = get("PETCLAW_AI_RATE_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.ai.rate_window_secs = v;
        }

        if let Some(val) = get("PETCLAW_PROVIDERS_ANTHROPIC_API_KEY").or_else(|| get("ANTHROPIC_API_KEY"))
        {
            self.providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default)
                .api_key = Some(val);
        }
        if let Some(val) = get("PETCLAW_PROVIDERS_GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.providers
                .gemini
                .get_or_insert_with(ProviderConfig::default)
                .api_key = Some(val);
        }
        if let Some(val) = get("PETCLAW_PROVIDERS_OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.providers
                .openai
                .get_or_insert_with(ProviderConfig::default)
                .api_key = Some(val);
        }
        if let Some(val) = get("PETCLAW_PROVIDERS_OPENAI_API_BASE") {
            self.providers
                .openai
                .get_or_insert_with(ProviderConfig::default)
                .api_base = Some(val);
        }

        if let Some(val) = get("PETCLAW_PET_STATE_PATH") {
            self.pet.state_path = val;
        }
        if let Some(v) = get("PETCLAW_SHELL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.shell.timeout_secs = v;
        }
        if let Some(v) = get("PETCLAW_SHELL_MAX_OUTPUT_BYTES").and_then(|v| v.parse().ok()) {
            self.shell.max_output_bytes = v;
        }
        if let Some(val) = get("PETCLAW_LOGGING_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Returns the expanded state path (resolves ~ to home directory)
    pub fn state_path(&self) -> PathBuf {
        expand_home(&self.pet.state_path)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.ai.rate_window_secs)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
