//! Configuration type definitions for PetClaw
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partial (or missing) config file is always valid input.

use serde::{Deserialize, Serialize};

/// Main configuration struct for PetClaw
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider selection and dialogue loop limits
    pub ai: AiConfig,
    /// LLM provider credentials and models
    pub providers: ProvidersConfig,
    /// Pet state persistence
    pub pet: PetConfig,
    /// Command sandbox limits
    pub shell: ShellConfig,
    /// Telemetry application cadence
    pub monitor: MonitorConfig,
    /// Log output
    pub logging: LoggingConfig,
}

// ============================================================================
// AI Configuration
// ============================================================================

/// Dialogue loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Forced provider (`claude`, `gemini`, `openai`); `None` auto-detects
    /// from whichever API key is present.
    pub provider: Option<String>,
    /// Maximum tokens for each provider response
    pub max_tokens: u32,
    /// Maximum tool iterations per `ask`
    pub max_tool_iterations: u32,
    /// Dialogue requests admitted per window. 0 disables rate limiting.
    pub rate_limit: u32,
    /// Sliding window length in seconds
    pub rate_window_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: None,
            max_tokens: 1024,
            max_tool_iterations: 5,
            rate_limit: 10,
            rate_window_secs: 60,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Credentials for the supported backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Anthropic Claude configuration
    pub anthropic: Option<ProviderConfig>,
    /// Google Gemini configuration
    pub gemini: Option<ProviderConfig>,
    /// OpenAI (or OpenAI-compatible) configuration
    pub openai: Option<ProviderConfig>,
}

/// Generic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(default)]
    pub api_base: Option<String>,
    /// Model override; each backend has its own default
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderConfig {
    /// The API key, if one is set and non-blank.
    pub fn key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Pet Configuration
// ============================================================================

/// Pet state persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    /// Where the state record lives (`~` is expanded)
    pub state_path: String,
    /// Seconds between periodic saves
    pub save_interval_secs: u64,
    /// Flavour text for the system prompt's personality section
    pub personality: Option<String>,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            state_path: "~/.petclaw/state.json".to_string(),
            save_interval_secs: 300,
            personality: None,
        }
    }
}

// ============================================================================
// Shell Configuration
// ============================================================================

/// Default captured output cap for shell commands.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024;

/// Command sandbox limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Hard deadline for a single command, in seconds
    pub timeout_secs: u64,
    /// Captured output cap in bytes
    pub max_output_bytes: usize,
    /// Patterns blocked in addition to the built-in deny-list
    pub extra_blocked_patterns: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            extra_blocked_patterns: Vec::new(),
        }
    }
}

// ============================================================================
// Monitor Configuration
// ============================================================================

/// How often host telemetry is folded into the pet's vitals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// Compact, grep-friendly, with `component` fields
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Optional log file (JSON format only)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}
