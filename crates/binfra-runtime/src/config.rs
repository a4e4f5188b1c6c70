//! Runtime configuration loading.
//!
//! Configuration is an explicit object constructed by the caller and passed
//! down; nothing in this crate reads a global. Files can be YAML or JSON,
//! with every field optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::retry::{InvalidPolicy, RetryPolicy};

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] InvalidPolicy),
}

/// Configuration for the runtime crate.
///
/// ```yaml
/// retry:
///   max_retries: 3
///   attempt_timeout: 60s
///   initial_delay: 10s
///   backoff_factor: 2.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Retry policy applied by executors built from this config
    pub retry: RetryPolicy,
}

impl RuntimeConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
retry:
  max_retries: 5
  attempt_timeout: 90s
  initial_delay: 2s
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(90));
        assert_eq!(config.retry.initial_delay, Duration::from_secs(2));
        // Omitted fields take defaults
        assert_eq!(config.retry.backoff_factor, 2.0);
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"retry": {"max_retries": 1, "attempt_timeout": "15s"}}"#;
        let config = RuntimeConfig::from_json(json).unwrap();
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_policy_is_rejected_on_load() {
        let yaml = r#"
retry:
  attempt_timeout: 0s
"#;
        let err = RuntimeConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(InvalidPolicy::ZeroTimeout)
        ));
    }

    #[test]
    fn test_unparsable_duration_is_a_yaml_error() {
        let yaml = r#"
retry:
  attempt_timeout: sixty seconds
"#;
        assert!(matches!(
            RuntimeConfig::from_yaml(yaml).unwrap_err(),
            ConfigError::YamlError(_)
        ));
    }
}
