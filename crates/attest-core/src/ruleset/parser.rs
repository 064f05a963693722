//! Rule set seed files in YAML or JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::registry::{RegistryError, RuleSetRegistry};
use super::RuleSetConfig;

/// Errors that can occur when loading rule set files.
#[derive(Error, Debug)]
pub enum RuleSetError {
    #[error("Failed to read rule set file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rule set file validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to register rule set: {0}")]
    Registry(#[from] RegistryError),
}

/// A file of rule set configs.
///
/// ```yaml
/// ruleSets:
///   - id: defi-kyc-strict
///     displayName: Strict KYC
///     domain: compliance
///     parameters:
///       riskThreshold: 0.3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetFile {
    #[serde(alias = "rule_sets")]
    pub rule_sets: Vec<RuleSetConfig>,
}

impl RuleSetFile {
    /// Parse a rule set file from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleSetError> {
        let file: RuleSetFile = serde_yaml::from_str(yaml)?;
        file.validate()?;
        Ok(file)
    }

    /// Parse a rule set file from JSON string.
    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        let file: RuleSetFile = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    /// Parse a rule set file, picking the format from the extension.
    /// Anything other than `.json` is read as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Register every entry, replacing rule sets with the same id.
    /// Returns the number of entries registered.
    pub fn register(self, registry: &RuleSetRegistry) -> Result<usize, RuleSetError> {
        let count = self.rule_sets.len();
        for config in self.rule_sets {
            registry.upsert(config)?;
        }
        tracing::debug!(count, "rule set file registered");
        Ok(count)
    }

    fn validate(&self) -> Result<(), RuleSetError> {
        let mut seen = HashSet::new();
        for config in &self.rule_sets {
            if config.display_name.trim().is_empty() {
                return Err(RuleSetError::ValidationError(format!(
                    "Rule set {} has an empty displayName",
                    config.id
                )));
            }
            if !seen.insert(config.id.as_str()) {
                return Err(RuleSetError::ValidationError(format!(
                    "Duplicate rule set ID: {}",
                    config.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationDomain;

    const YAML: &str = r#"
ruleSets:
  - id: defi-kyc-strict
    displayName: Strict KYC
    domain: compliance
    parameters:
      riskThreshold: 0.3
      checkOFAC: true
  - id: social-lenient
    name: Lenient moderation
    validationType: WEB3_SOCIAL
    parameters:
      toxicityThreshold: 0.95
      checkSpam: false
"#;

    #[test]
    fn test_parse_yaml_with_aliases() {
        let file = RuleSetFile::from_yaml(YAML).unwrap();
        assert_eq!(file.rule_sets.len(), 2);
        assert_eq!(file.rule_sets[1].domain, ValidationDomain::SocialContent);
        assert_eq!(file.rule_sets[1].display_name, "Lenient moderation");
        assert!(file.rule_sets[1].active);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"ruleSets":[{"id":"sensor-strict","displayName":"Strict sensors","domain":"sensor_telemetry","parameters":{"anomalyThreshold":0.1}}]}"#;
        let file = RuleSetFile::from_json(json).unwrap();
        assert_eq!(file.rule_sets[0].parameters.number("anomalyThreshold"), Some(0.1));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
ruleSets:
  - { id: dup-v1, displayName: A, domain: compliance }
  - { id: dup-v1, displayName: B, domain: compliance }
"#;
        assert!(matches!(
            RuleSetFile::from_yaml(yaml),
            Err(RuleSetError::ValidationError(_))
        ));
    }

    #[test]
    fn test_register_over_defaults() {
        let registry = RuleSetRegistry::with_defaults();
        let count = RuleSetFile::from_yaml(YAML).unwrap().register(&registry).unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.len(), 6);
        assert_eq!(
            registry.parameters("social-lenient").unwrap().flag("checkSpam"),
            Some(false)
        );
    }

    #[test]
    fn test_register_rejects_schema_violation() {
        let yaml = r#"
ruleSets:
  - { id: "NO", displayName: Bad, domain: compliance }
"#;
        let registry = RuleSetRegistry::new();
        let result = RuleSetFile::from_yaml(yaml).unwrap().register(&registry);
        assert!(matches!(result, Err(RuleSetError::Registry(RegistryError::Invalid(_)))));
    }
}
