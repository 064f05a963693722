//! Runtime configuration.
//!
//! Loaded from YAML; every field has a default, so an empty document is a
//! valid config. Durations are human-readable (`"15s"`, `"1h"`) or plain
//! seconds.
//!
//! ```yaml
//! capability:
//!   provider:
//!     type: openai
//!     settings:
//!       base_url: https://api.openai.com/v1
//!   model: gpt-4
//!   timeout: 15s
//!   retries: 2
//! circuitBreaker:
//!   failureThreshold: 3
//!   recoveryTimeout: 30s
//! cache:
//!   maxEntries: 10000
//!   ttl: 1h
//! sanctions:
//!   - "0x1234567890123456789012345678901234567890"
//! ruleSetsFile: rule-sets.yaml
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use attest_core::RuleSetError;

use crate::completion::{ProviderError, Sampling};
use crate::resilience::CircuitBreakerConfig;

/// Errors loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Rule-set file error: {0}")]
    RuleSets(#[from] RuleSetError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub capability: CapabilityConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,

    /// Replaces the built-in sanctions list when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanctions: Option<Vec<String>>,

    /// Rule sets registered on top of the seeded defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_sets_file: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A relative `ruleSetsFile` resolves against the
    /// config file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&yaml)?;
        if let (Some(file), Some(dir)) = (&config.rule_sets_file, path.parent()) {
            if file.is_relative() {
                config.rule_sets_file = Some(dir.join(file));
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capability = &self.capability;
        if !(0.0..=2.0).contains(&capability.temperature) {
            return Err(ConfigError::Invalid(format!(
                "capability.temperature must be within [0, 2], got {}",
                capability.temperature
            )));
        }
        if capability.max_tokens == 0 {
            return Err(ConfigError::Invalid("capability.maxTokens must be positive".to_string()));
        }
        if capability.timeout.is_zero() {
            return Err(ConfigError::Invalid("capability.timeout must be positive".to_string()));
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuitBreaker thresholds must be positive".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid("cache.maxEntries must be positive".to_string()));
        }
        Ok(())
    }
}

/// AI capability settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilityConfig {
    /// Set false to run heuristics only even when a provider is configured.
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,

    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,

    /// Per-attempt timeout.
    #[serde(with = "human_duration")]
    pub timeout: Duration,

    /// Extra attempts after a transient failure.
    pub retries: usize,

    /// First backoff delay; doubles per retry.
    #[serde(with = "human_duration")]
    pub retry_delay: Duration,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: None,
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout: Duration::from_secs(15),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl CapabilityConfig {
    /// Default sampling for every agent built on this capability.
    pub fn sampling(&self) -> Sampling {
        Sampling {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

/// Backend selection: a provider type plus settings that type understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default = "empty_settings")]
    pub settings: JsonValue,
}

fn empty_settings() -> JsonValue {
    JsonValue::Object(Default::default())
}

/// AI assessment cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "human_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Serde for durations written as `"30s"` / `"1h 30m"` or integer seconds.
pub(crate) mod human_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Repr::Text(text) => humantime::parse_duration(text.trim()).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();

        assert_eq!(config.capability.model, "gpt-4");
        assert_eq!(config.capability.max_tokens, 1000);
        assert_eq!(config.capability.timeout, Duration::from_secs(15));
        assert_eq!(config.capability.retries, 2);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.ttl, Duration::from_secs(3600));
        assert!(config.sanctions.is_none());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
capability:
  provider:
    type: openai
    settings:
      base_url: https://gateway.internal/v1
  model: gpt-4o-mini
  temperature: 0.0
  timeout: 5s
  retries: 0
circuitBreaker:
  recoveryTimeout: 2m
cache:
  enabled: false
  ttl: 600
sanctions:
  - "0xdead000000000000000000000000000000000000"
ruleSetsFile: rules.yaml
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();

        let provider = config.capability.provider.as_ref().unwrap();
        assert_eq!(provider.provider_type, "openai");
        assert_eq!(provider.settings["base_url"], "https://gateway.internal/v1");
        assert_eq!(config.capability.timeout, Duration::from_secs(5));
        assert_eq!(config.circuit_breaker.recovery_timeout, Duration::from_secs(120));
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
        assert!(!config.cache.enabled);
        assert_eq!(config.sanctions.as_ref().map(Vec::len), Some(1));
        assert_eq!(config.rule_sets_file, Some(PathBuf::from("rules.yaml")));

        let sampling = config.capability.sampling();
        assert_eq!(sampling.model, "gpt-4o-mini");
        assert_eq!(sampling.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            RuntimeConfig::from_yaml("capability:\n  temperature: 3.5\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("capability:\n  maxTokens: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("circuitBreaker:\n  failureThreshold: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_duration_is_yaml_error() {
        assert!(matches!(
            RuntimeConfig::from_yaml("capability:\n  timeout: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_durations_serialize_human_readable() {
        let yaml = serde_yaml::to_string(&CacheConfig::default()).unwrap();
        assert!(yaml.contains("ttl: 1h"));
    }
}
