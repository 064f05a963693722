//! # attest-core
//!
//! Deterministic validation routing, scoring and proof hashing.
//!
//! This crate answers, for a typed payload and a rule set:
//! - Does the payload pass the rule set's thresholds?
//! - How confident is that decision?
//! - Which hashes bind the decision to the exact payload?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same payload and parameters produce the same scores
//! 2. **No LLM calls**: Heuristic validators only; AI lives in `attest-runtime`
//! 3. **Total**: Domain input defects become failed verdicts, never panics
//! 4. **Content-addressed**: Proof hashes ignore object key order
//!
//! ## Example
//!
//! ```rust,ignore
//! use attest_core::{validate, RuleSetRegistry, ValidationDomain, ValidationRequest, ValidatorSet};
//! use serde_json::json;
//!
//! let registry = RuleSetRegistry::with_defaults();
//! let validators = ValidatorSet::standard();
//! let request = ValidationRequest::with_default_rule_set(
//!     ValidationDomain::Compliance,
//!     json!({ "walletAddress": "0x742d35Cc6634C0532925a3b844Bc454e4438f44e" }),
//! );
//!
//! let outcome = validate(&registry, &validators, request)?;
//! println!("valid={} proof={}", outcome.verdict.is_valid, outcome.proof.proof_hash);
//! ```

pub mod pipeline;
pub mod proof;
pub mod ruleset;
pub mod types;
pub mod validators;

// Re-export main types at crate root
pub use pipeline::{
    post_validate, pre_validate, recover, recover_outcome, resolve_rule_set, RequestPhase,
    ROUTING_KEYS,
};
pub use proof::{canonicalize, data_hash, proof_hash, AttestationRequest, ProofRecord};
pub use ruleset::{
    default_rule_sets, ParamValue, Parameters, RegistryError, RuleSet, RuleSetConfig,
    RuleSetError, RuleSetFile, RuleSetPatch, RuleSetRegistry,
};
pub use types::{
    clamp_confidence, Details, PreparedRequest, ValidationDomain, ValidationOutcome,
    ValidationRequest, Verdict,
};
pub use validators::{
    heuristic_validator, ComplianceValidator, ResearchIntegrityValidator, SanctionsList,
    SensorTelemetryValidator, SocialContentValidator, ValidationContext, Validator,
    ValidatorSet,
};

use std::time::Instant;
use thiserror::Error;

/// Errors raised while routing a validation request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Payload is empty")]
    EmptyPayload,

    #[error("Unknown validation domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error("Rule set {rule_set_id} belongs to domain {actual}, not {requested}")]
    DomainMismatch {
        rule_set_id: String,
        requested: ValidationDomain,
        actual: ValidationDomain,
    },

    #[error("Rule set {0} is inactive")]
    InactiveRuleSet(String),

    #[error("No validator registered for domain {0}")]
    NoValidator(ValidationDomain),
}

/// Broad classification of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The payload itself is defective; recovered into a failed verdict.
    Input,

    /// The request names a domain or rule set the service cannot honor.
    Config,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingField(_) | ValidationError::EmptyPayload => ErrorKind::Input,
            ValidationError::UnknownDomain(_)
            | ValidationError::UnknownRuleSet(_)
            | ValidationError::DomainMismatch { .. }
            | ValidationError::InactiveRuleSet(_)
            | ValidationError::NoValidator(_) => ErrorKind::Config,
        }
    }

    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

/// Validate a request with the heuristic validators.
///
/// Input errors come back as a failed verdict; config errors are returned.
pub fn validate(
    registry: &RuleSetRegistry,
    validators: &ValidatorSet,
    request: ValidationRequest,
) -> Result<ValidationOutcome, ValidationError> {
    let started = Instant::now();

    let prepared = match pre_validate(&request) {
        Ok(prepared) => prepared,
        Err(err) if err.is_input_error() => {
            tracing::debug!(error = %err, "input error recovered");
            return Ok(recover_outcome(
                &request,
                err.to_string(),
                RequestPhase::Received,
                started.elapsed(),
            ));
        }
        Err(err) => return Err(err),
    };

    let rule_set = resolve_rule_set(registry, &prepared)?;
    let validator = validators.get(prepared.domain)?;

    let context = ValidationContext::new(&rule_set);
    let verdict = validator.validate(&prepared.payload, &rule_set.parameters, &context);
    let verdict = post_validate(verdict, &prepared, started.elapsed());

    let proof = ProofRecord::derive(&prepared.payload, &verdict, &prepared.rule_set_id);
    Ok(ValidationOutcome { verdict, proof })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (RuleSetRegistry, ValidatorSet) {
        (RuleSetRegistry::with_defaults(), ValidatorSet::standard())
    }

    #[test]
    fn test_basic_validation() {
        let (registry, validators) = setup();
        let request = ValidationRequest::with_default_rule_set(
            ValidationDomain::SocialContent,
            json!({ "content": "Great community call today, thanks everyone." }),
        );

        let outcome = validate(&registry, &validators, request).unwrap();

        assert!(outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.details["ruleSetId"], "web3-social-v1");
        assert_eq!(outcome.verdict.details["domain"], "social_content");
        assert!(outcome.proof.proof_hash.starts_with("0x"));
    }

    #[test]
    fn test_sanctioned_wallet_blocked() {
        let (registry, validators) = setup();
        let request = ValidationRequest::with_default_rule_set(
            ValidationDomain::Compliance,
            json!({ "walletAddress": "0x1234567890123456789012345678901234567890" }),
        );

        let outcome = validate(&registry, &validators, request).unwrap();

        assert!(!outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.confidence, 1.0);
    }

    #[test]
    fn test_missing_payload_recovered() {
        let (registry, validators) = setup();
        let request = ValidationRequest {
            payload: None,
            rule_set_id: Some("defi-kyc-v1".to_string()),
            domain: Some("compliance".to_string()),
            ..Default::default()
        };

        let outcome = validate(&registry, &validators, request).unwrap();

        assert!(!outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.confidence, 0.0);
        assert!(outcome.verdict.errors.is_some());
    }

    #[test]
    fn test_unknown_rule_set_surfaces() {
        let (registry, validators) = setup();
        let request =
            ValidationRequest::new(ValidationDomain::Compliance, "nope-v1", json!({ "walletAddress": "0xabc" }));

        let err = validate(&registry, &validators, request).unwrap_err();
        assert_eq!(err, ValidationError::UnknownRuleSet("nope-v1".to_string()));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_domain_is_config_error() {
        let (registry, validators) = setup();
        let request = ValidationRequest {
            payload: Some(json!({ "temperature": 21 })),
            rule_set_id: Some("weather-v1".to_string()),
            domain: Some("weather".to_string()),
            ..Default::default()
        };

        let err = validate(&registry, &validators, request).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDomain(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_proof_ignores_key_order() {
        let (registry, validators) = setup();
        let title_first: serde_json::Value = serde_json::from_str(
            r#"{"title":"On Rust","content":"Ownership makes aliasing explicit [1].","meta":{"year":2024,"lang":"en"}}"#,
        )
        .unwrap();
        let content_first: serde_json::Value = serde_json::from_str(
            r#"{"meta":{"lang":"en","year":2024},"content":"Ownership makes aliasing explicit [1].","title":"On Rust"}"#,
        )
        .unwrap();
        assert_ne!(title_first.to_string(), content_first.to_string());

        let a = ValidationRequest::with_default_rule_set(ValidationDomain::ResearchIntegrity, title_first);
        let b = ValidationRequest::with_default_rule_set(ValidationDomain::ResearchIntegrity, content_first);

        let first = validate(&registry, &validators, a).unwrap();
        let second = validate(&registry, &validators, b).unwrap();

        assert_eq!(first.proof.data_hash, second.proof.data_hash);
    }
}
