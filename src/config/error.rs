// Licensed under the Open Software License version 3.0
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal startup errors. Messages name sections and keys, never values.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("config file {path} not found or unreadable: {reason}")]
    NotFound { path: String, reason: String },

    #[error("malformed section [{section}]: {reason}")]
    MalformedSection { section: String, reason: String },

    #[error("section [{section}] is missing required key \"{key}\"")]
    MissingKey { section: String, key: String },

    #[error("invalid value for \"{key}\" in section [{section}]: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing_key(section: &str, key: &str) -> Self {
        Self::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid_value(section: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
