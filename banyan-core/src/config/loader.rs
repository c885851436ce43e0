//! Configuration loader supporting YAML, TOML, and JSON formats.

use serde::de::DeserializeOwned;
use std::path::Path;

use super::Validatable;
use crate::error::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }
}

/// Configuration loader with format detection, validation, and
/// environment overrides.
///
/// # Example
///
/// ```rust,ignore
/// use banyan_core::config::{ConfigLoader, StrategyConfig};
///
/// let config: StrategyConfig = ConfigLoader::new()
///     .with_env_prefix("BANYAN")
///     .load_validated("strategy.yaml")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self { env_prefix: None }
    }

    /// Sets the environment variable prefix for overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Looks up `{PREFIX}_{NAME}` in the environment, if a prefix is set.
    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<String> {
        let prefix = self.env_prefix.as_deref()?;
        std::env::var(format!("{prefix}_{name}")).ok()
    }

    /// Parses configuration from a string in the given format.
    pub fn load_str<T: DeserializeOwned>(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> Result<T, ConfigError> {
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: e.to_string(),
                })
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: e.to_string(),
                })
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::InvalidFormat {
                    path: "<string>".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Loads configuration from a file, detecting the format from the
    /// extension.
    pub fn load_file<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.load_str(&content, format)
    }

    /// Loads configuration from a file and runs its validation pass.
    pub fn load_validated<T: DeserializeOwned + Validatable>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<T, ConfigError> {
        let config: T = self.load_file(path)?;
        config.validate()?;
        Ok(config)
    }
}
