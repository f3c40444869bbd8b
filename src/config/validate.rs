//! Configuration validation.

use super::Config;
use crate::error::{PetError, Result};

/// Provider names accepted by `ai.provider`.
pub const KNOWN_PROVIDERS: &[&str] = &["claude", "gemini", "openai"];

/// Reject configurations the core cannot run with.
///
/// A zero rate limit is allowed (it disables limiting); a zero rate window
/// with a non-zero limit is not, since no request would ever expire.
pub fn validate(config: &Config) -> Result<()> {
    if let Some(provider) = &config.ai.provider {
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(PetError::Config(format!(
                "unknown ai.provider '{}' (expected one of: {})",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }
    }
    if config.ai.rate_limit > 0 && config.ai.rate_window_secs == 0 {
        return Err(PetError::Config(
            "ai.rate_window_secs must be positive when ai.rate_limit is set".into(),
        ));
    }
    if config.shell.timeout_secs == 0 {
        return Err(PetError::Config("shell.timeout_secs must be positive".into()));
    }
    if config.shell.max_output_bytes == 0 {
        return Err(PetError::Config(
            "shell.max_output_bytes must be positive".into(),
        ));
    }
    if config.pet.save_interval_secs == 0 {
        return Err(PetError::Config(
            "pet.save_interval_secs must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::default();
        config.ai.provider = Some("llama".into());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("unknown ai.provider 'llama'"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.shell.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_rate_limit_allowed() {
        let mut config = Config::default();
        config.ai.rate_limit = 0;
        config.ai.rate_window_secs = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_window_with_limit_rejected() {
        let mut config = Config::default();
        config.ai.rate_window_secs = 0;
        assert!(validate(&config).is_err());
    }
}
