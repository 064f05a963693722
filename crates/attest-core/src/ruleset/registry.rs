//! In-memory rule set catalog.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

use super::schema::validate_rule_set_schema;
use super::{default_rule_sets, Parameters, RuleSet, RuleSetConfig, RuleSetPatch};
use crate::types::ValidationDomain;

/// Errors from registry mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Rule set {0} already exists")]
    Conflict(String),

    #[error("Invalid rule set: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Catalog of rule sets keyed by id.
///
/// Reads take a shared lock and return snapshots. Writes take the exclusive
/// lock for the whole read-modify-write, so concurrent updates of one id
/// never interleave.
#[derive(Debug, Default)]
pub struct RuleSetRegistry {
    rule_sets: RwLock<BTreeMap<String, RuleSet>>,
}

impl RuleSetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with one default rule set per domain.
    pub fn with_defaults() -> Self {
        let now = Utc::now();
        let rule_sets = default_rule_sets()
            .into_iter()
            .map(|config| (config.id.clone(), config.into_rule_set(now)))
            .collect();

        Self {
            rule_sets: RwLock::new(rule_sets),
        }
    }

    /// All rule sets, optionally restricted to one domain, ordered by id.
    pub fn list(&self, domain: Option<ValidationDomain>) -> Vec<RuleSet> {
        self.rule_sets
            .read()
            .values()
            .filter(|rs| domain.map_or(true, |d| rs.domain == d))
            .cloned()
            .collect()
    }

    /// Snapshot of a rule set by id.
    pub fn get(&self, id: &str) -> Option<RuleSet> {
        self.rule_sets.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rule_sets.read().contains_key(id)
    }

    /// Register a new rule set, stamping both timestamps.
    pub fn create(&self, config: RuleSetConfig) -> Result<RuleSet, RegistryError> {
        check_schema(&config)?;

        let mut rule_sets = self.rule_sets.write();
        if rule_sets.contains_key(&config.id) {
            return Err(RegistryError::Conflict(config.id));
        }

        let rule_set = config.into_rule_set(Utc::now());
        rule_sets.insert(rule_set.id.clone(), rule_set.clone());
        tracing::debug!(rule_set_id = %rule_set.id, domain = %rule_set.domain, "rule set created");
        Ok(rule_set)
    }

    /// Register or replace a rule set. Used when loading seed files over the
    /// defaults; a replaced entry keeps its original `created_at`.
    pub fn upsert(&self, config: RuleSetConfig) -> Result<RuleSet, RegistryError> {
        check_schema(&config)?;

        let now = Utc::now();
        let mut rule_sets = self.rule_sets.write();
        let created_at = rule_sets.get(&config.id).map(|existing| existing.created_at);

        let mut rule_set = config.into_rule_set(now);
        if let Some(created_at) = created_at {
            rule_set.created_at = created_at;
        }
        rule_sets.insert(rule_set.id.clone(), rule_set.clone());
        Ok(rule_set)
    }

    /// Apply a partial update. Returns `None` when the id is unknown.
    pub fn update(&self, id: &str, patch: RuleSetPatch) -> Result<Option<RuleSet>, RegistryError> {
        let mut rule_sets = self.rule_sets.write();
        let Some(existing) = rule_sets.get(id) else {
            return Ok(None);
        };

        let mut updated = existing.clone();
        patch.apply(&mut updated);
        check_schema(&config_of(&updated))?;
        updated.updated_at = Utc::now();

        rule_sets.insert(id.to_string(), updated.clone());
        tracing::debug!(rule_set_id = %id, "rule set updated");
        Ok(Some(updated))
    }

    /// Remove a rule set from future lookups.
    ///
    /// Verdicts already produced under it keep their proof records.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.rule_sets.write().remove(id).is_some();
        if removed {
            tracing::debug!(rule_set_id = %id, "rule set deleted");
        }
        removed
    }

    /// Snapshot of a rule set's parameters.
    pub fn parameters(&self, id: &str) -> Option<Parameters> {
        self.rule_sets.read().get(id).map(|rs| rs.parameters.clone())
    }

    /// Merge parameters into an existing rule set. Returns `false` when the
    /// id is unknown.
    pub fn update_parameters(&self, id: &str, parameters: Parameters) -> Result<bool, RegistryError> {
        let mut rule_sets = self.rule_sets.write();
        let Some(existing) = rule_sets.get(id) else {
            return Ok(false);
        };

        let mut updated = existing.clone();
        updated.parameters.merge(parameters);
        check_schema(&config_of(&updated))?;
        updated.updated_at = Utc::now();

        rule_sets.insert(id.to_string(), updated);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.rule_sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.read().is_empty()
    }
}

fn config_of(rule_set: &RuleSet) -> RuleSetConfig {
    RuleSetConfig {
        id: rule_set.id.clone(),
        display_name: rule_set.display_name.clone(),
        description: rule_set.description.clone(),
        domain: rule_set.domain,
        parameters: rule_set.parameters.clone(),
        active: rule_set.active,
    }
}

fn check_schema(config: &RuleSetConfig) -> Result<(), RegistryError> {
    let value = serde_json::to_value(config).map_err(|e| RegistryError::Invalid(vec![e.to_string()]))?;
    validate_rule_set_schema(&value).map_err(RegistryError::Invalid)
}
