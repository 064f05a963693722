//! Domain validators.
//!
//! Each domain has one heuristic validator: a pure function from a payload
//! and rule set parameters to a [`Verdict`]. Validators never fail. A payload
//! missing a field the domain needs yields an invalid, zero-confidence
//! verdict with an `error` detail.
//!
//! Validators are selected through [`ValidatorSet`], built once and handed to
//! whatever dispatches requests.

mod compliance;
pub mod patterns;
mod research;
mod sensor;
mod social;

pub use compliance::{ComplianceValidator, SanctionsList, SANCTIONS_MATCH};
pub use research::ResearchIntegrityValidator;
pub use sensor::SensorTelemetryValidator;
pub use social::{spam_score, toxicity_score, SocialContentValidator};

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ruleset::{Parameters, RuleSet};
use crate::types::{Details, ValidationDomain, Verdict};
use crate::ValidationError;

/// Rule set identity handed to a validator alongside its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    pub rule_set_id: String,
    pub domain: ValidationDomain,
    pub rule_set_updated_at: DateTime<Utc>,
}

impl ValidationContext {
    pub fn new(rule_set: &RuleSet) -> Self {
        Self {
            rule_set_id: rule_set.id.clone(),
            domain: rule_set.domain,
            rule_set_updated_at: rule_set.updated_at,
        }
    }
}

/// A deterministic domain validator.
pub trait Validator: Send + Sync {
    /// The domain this validator screens.
    fn domain(&self) -> ValidationDomain;

    /// Produce a verdict for the payload under the given parameters.
    fn validate(&self, payload: &Value, parameters: &Parameters, context: &ValidationContext) -> Verdict;
}

/// The heuristic validator for a domain.
pub fn heuristic_validator(domain: ValidationDomain) -> Arc<dyn Validator> {
    match domain {
        ValidationDomain::Compliance => Arc::new(ComplianceValidator::default()),
        ValidationDomain::ResearchIntegrity => Arc::new(ResearchIntegrityValidator),
        ValidationDomain::SensorTelemetry => Arc::new(SensorTelemetryValidator),
        ValidationDomain::SocialContent => Arc::new(SocialContentValidator),
    }
}

/// Validators keyed by domain.
#[derive(Clone, Default)]
pub struct ValidatorSet {
    validators: BTreeMap<ValidationDomain, Arc<dyn Validator>>,
}

impl ValidatorSet {
    /// A set with no validators.
    pub fn empty() -> Self {
        Self::default()
    }

    /// One heuristic validator per domain.
    pub fn standard() -> Self {
        ValidationDomain::ALL
            .iter()
            .fold(Self::empty(), |set, domain| set.with(heuristic_validator(*domain)))
    }

    /// The standard set with a custom sanctions list for compliance.
    pub fn standard_with_sanctions(sanctions: SanctionsList) -> Self {
        Self::standard().with(Arc::new(ComplianceValidator::new(sanctions)))
    }

    /// Register a validator, replacing any existing one for its domain.
    pub fn with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.insert(validator.domain(), validator);
        self
    }

    pub fn get(&self, domain: ValidationDomain) -> Result<Arc<dyn Validator>, ValidationError> {
        self.validators
            .get(&domain)
            .cloned()
            .ok_or(ValidationError::NoValidator(domain))
    }

    pub fn domains(&self) -> Vec<ValidationDomain> {
        self.validators.keys().copied().collect()
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorSet")
            .field("domains", &self.domains())
            .finish()
    }
}

/// A non-empty string field of the payload.
pub(crate) fn text_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// `"passed"` or `"failed"` for a check block.
pub(crate) fn check(passed: bool) -> Value {
    Value::from(if passed { "passed" } else { "failed" })
}

/// Unwrap a `json!` object literal into details.
pub(crate) fn into_details(value: Value) -> Details {
    match value {
        Value::Object(map) => map,
        _ => Details::new(),
    }
}
