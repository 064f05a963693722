//! Rule sets: named parameter bundles scoped to a validation domain.
//!
//! Rule sets are structured data validated against JSON Schema on creation.
//! This module defines the types, the seeded defaults, the file loader and
//! the in-memory registry.

mod parser;
mod registry;
mod schema;

pub use parser::{RuleSetError, RuleSetFile};
pub use registry::{RegistryError, RuleSetRegistry};
pub use schema::validate_rule_set_schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ValidationDomain;

/// A single threshold or flag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Thresholds and flags keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric parameter; numeric strings are accepted.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }

    /// Boolean parameter; `"true"`/`"false"` strings and numbers are accepted.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(n) => Some(*n != 0.0),
            ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge `other` into `self`, overwriting shared keys.
    pub fn merge(&mut self, other: Parameters) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A registered rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Globally unique identifier
    pub id: String,

    /// Human-readable name
    pub display_name: String,

    /// What the rule set screens for
    pub description: String,

    /// Domain whose validator this rule set parameterizes
    pub domain: ValidationDomain,

    /// Thresholds and flags
    pub parameters: Parameters,

    /// Inactive rule sets are listed but refuse new validations
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetConfig {
    pub id: String,

    #[serde(alias = "name")]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(alias = "validationType")]
    pub domain: ValidationDomain,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default = "default_active", alias = "isActive")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleSetConfig {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, domain: ValidationDomain) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            domain,
            parameters: Parameters::new(),
            active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Materialize into a rule set stamped at `now`.
    pub(crate) fn into_rule_set(self, now: DateTime<Utc>) -> RuleSet {
        RuleSet {
            id: self.id,
            display_name: self.display_name,
            description: self.description,
            domain: self.domain,
            parameters: self.parameters,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a rule set. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetPatch {
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "validationType", skip_serializing_if = "Option::is_none")]
    pub domain: Option<ValidationDomain>,

    /// Replaces the whole parameter map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,

    #[serde(default, alias = "isActive", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl RuleSetPatch {
    pub(crate) fn apply(self, rule_set: &mut RuleSet) {
        if let Some(display_name) = self.display_name {
            rule_set.display_name = display_name;
        }
        if let Some(description) = self.description {
            rule_set.description = description;
        }
        if let Some(domain) = self.domain {
            rule_set.domain = domain;
        }
        if let Some(parameters) = self.parameters {
            rule_set.parameters = parameters;
        }
        if let Some(active) = self.active {
            rule_set.active = active;
        }
    }
}

/// The rule sets seeded at startup, one per domain.
pub fn default_rule_sets() -> Vec<RuleSetConfig> {
    ValidationDomain::ALL
        .iter()
        .map(|domain| default_rule_set(*domain))
        .collect()
}

fn default_rule_set(domain: ValidationDomain) -> RuleSetConfig {
    let id = domain.default_rule_set_id();
    match domain {
        ValidationDomain::Compliance => RuleSetConfig::new(id, "DeFi KYC Validation", domain)
            .with_description("Standard KYC validation for DeFi protocols including OFAC screening")
            .with_parameters(
                Parameters::new()
                    .with("checkOFAC", true)
                    .with("riskThreshold", 0.7)
                    .with("requireDocuments", false),
            ),
        ValidationDomain::ResearchIntegrity => {
            RuleSetConfig::new(id, "DeSci Plagiarism Detection", domain)
                .with_description("Plagiarism detection for scientific papers and research")
                .with_parameters(
                    Parameters::new()
                        .with("similarityThreshold", 0.8)
                        .with("checkCitations", true)
                        .with("minWordCount", 100.0),
                )
        }
        ValidationDomain::SensorTelemetry => RuleSetConfig::new(id, "DePIN Sensor Validation", domain)
            .with_description("IoT sensor data validation and anomaly detection")
            .with_parameters(
                Parameters::new()
                    .with("anomalyThreshold", 0.9)
                    .with("timeWindowMinutes", 60.0)
                    .with("requireConsensus", true),
            ),
        ValidationDomain::SocialContent => RuleSetConfig::new(id, "Web3 Social Moderation", domain)
            .with_description("Content moderation for decentralized social platforms")
            .with_parameters(
                Parameters::new()
                    .with("toxicityThreshold", 0.8)
                    .with("spamThreshold", 0.7)
                    .with("checkSpam", true)
                    .with("allowAppeal", true),
            ),
    }
}
