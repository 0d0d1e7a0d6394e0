//! Configuration error types
//!
//! Errors raised while turning a flat settings map into typed backend configuration.
//! They are fatal at startup: a backend is never constructed from a settings map that
//! produced one of these.

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {key}")]
    Missing { key: String },

    #[error("Invalid value for setting {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load settings from {path}: {reason}")]
    Source { path: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        ConfigError::Missing { key: key.into() }
    }

    pub fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
