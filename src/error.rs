//! Error types for PetClaw
//!
//! [`PetError`] covers everything that can abort an operation. Sandbox
//! failures live in [`crate::sandbox::SandboxError`]; they never abort a
//! dialogue and are encoded into tool results instead.

use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// How a provider call failed, classified from the HTTP status.
///
/// The orchestrator never retries; callers that want to can consult
/// [`ProviderError::is_retryable`].
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 401/403
    #[error("Authentication error: {0}")]
    Auth(String),
    /// 429
    #[error("Rate limit error: {0}")]
    RateLimit(String),
    /// 402
    #[error("Billing error: {0}")]
    Billing(String),
    /// 5xx other than 529
    #[error("Server error: {0}")]
    ServerError(String),
    /// 400
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// 404, usually a misspelled model name
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    /// 408 or a transport timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// 529, or Anthropic's `overloaded_error` body
    #[error("Overloaded: {0}")]
    Overloaded(String),
    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Whether trying again later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_)
                | ProviderError::ServerError(_)
                | ProviderError::Timeout(_)
                | ProviderError::Overloaded(_)
        )
    }

    /// Short label for logs and user-facing hints.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimit(_) => "rate_limit",
            ProviderError::Billing(_) => "billing",
            ProviderError::ServerError(_) => "server",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::ModelNotFound(_) => "model_not_found",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Overloaded(_) => "overloaded",
            ProviderError::Unknown(_) => "unknown",
        }
    }
}

impl From<ProviderError> for PetError {
    fn from(err: ProviderError) -> Self {
        PetError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for PetClaw operations.
#[derive(Error, Debug)]
pub enum PetError {
    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or empty provider responses
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error carrying the HTTP classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// State persistence failures (save/load of the pet record)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A running daemon owns the pet state file
    #[error("Pet state is owned by the daemon (pid {pid})")]
    StateLocked { pid: u32 },

    /// The caller cancelled the operation before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for PetClaw operations.
pub type Result<T> = std::result::Result<T, PetError>;
