//! Bracket engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Upper bound for [`BracketConfig::advancement_offset_days`]
pub const MAX_ADVANCEMENT_OFFSET_DAYS: i64 = 365;

/// Policy settings used when creating playoff matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Match type stamped on every match the engine creates
    pub match_type: String,

    /// Days between advancement and the default date of the next-round match
    pub advancement_offset_days: i64,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            match_type: "playoff".to_string(),
            advancement_offset_days: 5,
        }
    }
}

impl BracketConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `BRACKET_MATCH_TYPE` and `BRACKET_ADVANCE_OFFSET_DAYS`; unset or
    /// unparsable values fall back to the defaults. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            match_type: lookup("BRACKET_MATCH_TYPE").unwrap_or(defaults.match_type),
            advancement_offset_days: parse_or(
                &lookup,
                "BRACKET_ADVANCE_OFFSET_DAYS",
                defaults.advancement_offset_days,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.match_type.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "BRACKET_MATCH_TYPE".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if !(0..=MAX_ADVANCEMENT_OFFSET_DAYS).contains(&self.advancement_offset_days) {
            return Err(ConfigError::Invalid {
                var: "BRACKET_ADVANCE_OFFSET_DAYS".to_string(),
                reason: format!("Must be between 0 and {MAX_ADVANCEMENT_OFFSET_DAYS}"),
            });
        }

        Ok(())
    }
}

/// Helper to parse a variable with default fallback
pub(crate) fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
