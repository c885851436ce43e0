//! Configuration-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type covering missing fields, invalid values, and
/// file access errors.
///
/// # Examples
///
/// ```
/// use banyan_core::error::ConfigError;
///
/// let error = ConfigError::invalid_value("fees.deposit", "rate exceeds 100%");
/// assert!(error.to_string().contains("fees.deposit"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Required configuration field is missing.
    #[error("[Config] Missing field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// Configuration value is invalid.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field with the invalid value.
        field: String,
        /// Reason why the value is invalid.
        reason: String,
    },

    /// A reinitialization tried to change a field that must survive
    /// upgrades unchanged (deposit asset, investment token, owner).
    #[error("[Config] Field '{field}' is immutable across reinitialization")]
    ImmutableField {
        /// Field that may not change.
        field: String,
    },

    /// Configuration file could not be read.
    #[error("[Config] Failed to read file '{path}': {reason}")]
    FileReadError {
        /// Path to the configuration file.
        path: String,
        /// Reason for the read failure.
        reason: String,
    },

    /// Configuration file format is invalid.
    #[error("[Config] Invalid format in '{path}': {reason}")]
    InvalidFormat {
        /// Path or source of the configuration.
        path: String,
        /// Reason for the format error.
        reason: String,
    },

    /// Configuration file format is not recognized.
    #[error("[Config] Unsupported format for '{path}'")]
    UnsupportedFormat {
        /// Path with the unrecognized extension.
        path: String,
    },
}

impl ConfigError {
    /// Creates a `MissingField` error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `ImmutableField` error.
    #[must_use]
    pub fn immutable_field(field: impl Into<String>) -> Self {
        Self::ImmutableField {
            field: field.into(),
        }
    }
}
