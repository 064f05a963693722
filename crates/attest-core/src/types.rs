//! Core types for validation requests, verdicts and domains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::proof::{AttestationRequest, ProofRecord};
use crate::ValidationError;

/// Free-form, domain-specific diagnostic details attached to a verdict.
pub type Details = Map<String, Value>;

/// The closed set of validation verticals.
///
/// Adding a domain means adding a variant here, a validator in
/// [`crate::validators`] and a default rule set in [`crate::ruleset`].
/// The compiler enforces the rest through exhaustive matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationDomain {
    /// Compliance / KYC screening of wallet identifiers.
    #[serde(alias = "DEFI_KYC")]
    Compliance,

    /// Research-integrity screening of scientific content.
    #[serde(alias = "DESCI_PLAGIARISM")]
    ResearchIntegrity,

    /// Sensor-telemetry screening of IoT readings.
    #[serde(alias = "DEPIN_SENSOR")]
    SensorTelemetry,

    /// Social-content moderation.
    #[serde(alias = "WEB3_SOCIAL")]
    SocialContent,
}

impl ValidationDomain {
    /// Every supported domain, in declaration order.
    pub const ALL: [ValidationDomain; 4] = [
        ValidationDomain::Compliance,
        ValidationDomain::ResearchIntegrity,
        ValidationDomain::SensorTelemetry,
        ValidationDomain::SocialContent,
    ];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationDomain::Compliance => "compliance",
            ValidationDomain::ResearchIntegrity => "research_integrity",
            ValidationDomain::SensorTelemetry => "sensor_telemetry",
            ValidationDomain::SocialContent => "social_content",
        }
    }

    /// Id of the rule set seeded for this domain at startup.
    pub fn default_rule_set_id(&self) -> &'static str {
        match self {
            ValidationDomain::Compliance => "defi-kyc-v1",
            ValidationDomain::ResearchIntegrity => "desci-plagiarism-v1",
            ValidationDomain::SensorTelemetry => "depin-sensor-v1",
            ValidationDomain::SocialContent => "web3-social-v1",
        }
    }

    /// Human-readable capabilities offered for this domain.
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            ValidationDomain::Compliance => &[
                "OFAC sanctions screening",
                "AML risk assessment",
                "Transaction pattern analysis",
                "Geographic risk evaluation",
            ],
            ValidationDomain::ResearchIntegrity => &[
                "Text similarity detection",
                "Citation analysis",
                "Academic integrity assessment",
                "Originality scoring",
            ],
            ValidationDomain::SensorTelemetry => &[
                "Anomaly detection",
                "Data quality assessment",
                "Temporal consistency analysis",
                "Physical plausibility validation",
            ],
            ValidationDomain::SocialContent => &[
                "Toxicity detection",
                "Spam identification",
                "Harassment detection",
                "Content policy compliance",
            ],
        }
    }
}

impl fmt::Display for ValidationDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationDomain {
    type Err = ValidationError;

    /// Accepts canonical names, kebab-case, and the legacy upper-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "compliance" | "defi_kyc" => Ok(ValidationDomain::Compliance),
            "research_integrity" | "desci_plagiarism" => Ok(ValidationDomain::ResearchIntegrity),
            "sensor_telemetry" | "depin_sensor" => Ok(ValidationDomain::SensorTelemetry),
            "social_content" | "web3_social" => Ok(ValidationDomain::SocialContent),
            _ => Err(ValidationError::UnknownDomain(s.to_string())),
        }
    }
}

/// A validation request as received on the wire.
///
/// Every field is optional so that a missing field is reported as
/// [`ValidationError::MissingField`] by pre-validation rather than as a
/// decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// The structured value to validate.
    #[serde(default, alias = "data", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Rule set parameterizing the validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_set_id: Option<String>,

    /// Declared domain; parsed during pre-validation.
    #[serde(default, alias = "validationType", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Caller annotations, not interpreted by the core.
    #[serde(default)]
    pub metadata: Details,
}

impl ValidationRequest {
    /// Create a request for a typed domain.
    pub fn new(domain: ValidationDomain, rule_set_id: impl Into<String>, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            rule_set_id: Some(rule_set_id.into()),
            domain: Some(domain.as_str().to_string()),
            metadata: Details::new(),
        }
    }

    /// Create a request against the domain's seeded rule set.
    pub fn with_default_rule_set(domain: ValidationDomain, payload: Value) -> Self {
        Self::new(domain, domain.default_rule_set_id(), payload)
    }

    /// Attach a metadata annotation.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A request that passed pre-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub payload: Value,
    pub rule_set_id: String,
    pub domain: ValidationDomain,
    pub metadata: Details,
}

/// The pass/fail outcome of one validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether the payload passed the rule set.
    pub is_valid: bool,

    /// Confidence in the decision, always within [0, 1].
    pub confidence: f64,

    /// When the verdict was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Domain sub-scores, reasoning and routing metadata.
    #[serde(default)]
    pub details: Details,

    /// Human-readable failure strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl Verdict {
    /// Create a verdict stamped now, clamping confidence into [0, 1].
    pub fn new(is_valid: bool, confidence: f64, details: Details) -> Self {
        Self {
            is_valid,
            confidence: clamp_confidence(confidence),
            timestamp: Some(Utc::now()),
            details,
            errors: None,
        }
    }

    /// Verdict for a payload missing a field its domain requires.
    pub fn input_defect(reason: impl Into<String>) -> Self {
        Self::failure(reason)
    }

    /// Invalid, zero-confidence verdict carrying a failure reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut details = Details::new();
        details.insert("error".to_string(), Value::String(reason.clone()));
        Self {
            is_valid: false,
            confidence: 0.0,
            timestamp: Some(Utc::now()),
            details,
            errors: Some(vec![reason]),
        }
    }

    /// Add a detail entry, replacing any existing value.
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Flags raised by the validator, if any.
    pub fn flags(&self) -> Vec<String> {
        self.details
            .get("flags")
            .and_then(Value::as_array)
            .map(|flags| {
                flags
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Timestamp as Unix milliseconds (0 when unset).
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Clamp a confidence into [0, 1]; NaN maps to 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A verdict together with its proof record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    pub proof: ProofRecord,
}

impl ValidationOutcome {
    /// Submission for the attestation layer. Metadata carries the verdict's
    /// confidence and timestamp.
    pub fn attestation_request(&self) -> AttestationRequest {
        let mut metadata = Details::new();
        metadata.insert("confidence".to_string(), Value::from(self.verdict.confidence));
        metadata.insert("timestamp".to_string(), Value::from(self.proof.timestamp));
        if let Some(domain) = self.verdict.details.get("domain") {
            metadata.insert("domain".to_string(), domain.clone());
        }

        AttestationRequest {
            data_hash: self.proof.data_hash.clone(),
            proof_hash: self.proof.proof_hash.clone(),
            rule_set_id: self.proof.rule_set_id.clone(),
            is_valid: self.verdict.is_valid,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_domain_parsing_accepts_aliases() {
        assert_eq!("compliance".parse::<ValidationDomain>().unwrap(), ValidationDomain::Compliance);
        assert_eq!("DEFI_KYC".parse::<ValidationDomain>().unwrap(), ValidationDomain::Compliance);
        assert_eq!(
            "research-integrity".parse::<ValidationDomain>().unwrap(),
            ValidationDomain::ResearchIntegrity
        );
        assert_eq!("WEB3_SOCIAL".parse::<ValidationDomain>().unwrap(), ValidationDomain::SocialContent);
        assert!(matches!(
            "weather".parse::<ValidationDomain>(),
            Err(ValidationError::UnknownDomain(_))
        ));
    }

    #[test]
    fn test_domain_serde_uses_snake_case() {
        let json = serde_json::to_string(&ValidationDomain::SensorTelemetry).unwrap();
        assert_eq!(json, "\"sensor_telemetry\"");

        let legacy: ValidationDomain = serde_json::from_str("\"DEPIN_SENSOR\"").unwrap();
        assert_eq!(legacy, ValidationDomain::SensorTelemetry);
    }

    #[test]
    fn test_request_accepts_legacy_field_names() {
        let request: ValidationRequest = serde_json::from_value(json!({
            "data": { "walletAddress": "0xabc" },
            "ruleSetId": "defi-kyc-v1",
            "validationType": "DEFI_KYC"
        }))
        .unwrap();

        assert_eq!(request.rule_set_id.as_deref(), Some("defi-kyc-v1"));
        assert_eq!(request.domain.as_deref(), Some("DEFI_KYC"));
        assert!(request.payload.is_some());
    }

    #[test]
    fn test_verdict_clamps_confidence() {
        assert_eq!(Verdict::new(true, 1.7, Details::new()).confidence, 1.0);
        assert_eq!(Verdict::new(true, -0.2, Details::new()).confidence, 0.0);
        assert_eq!(Verdict::new(true, f64::NAN, Details::new()).confidence, 0.0);
    }

    #[test]
    fn test_failure_verdict_shape() {
        let verdict = Verdict::failure("No content provided");
        assert!(!verdict.is_valid);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.details["error"], "No content provided");
        assert_eq!(verdict.errors, Some(vec!["No content provided".to_string()]));
    }

    #[test]
    fn test_attestation_request_mirrors_proof() {
        let payload = json!({ "content": "gm" });
        let verdict = Verdict::new(true, 0.9, Details::new()).with_detail("domain", json!("social_content"));
        let proof = ProofRecord::derive(&payload, &verdict, "web3-social-v1");
        let outcome = ValidationOutcome { verdict, proof };

        let request = outcome.attestation_request();
        assert_eq!(request.proof_hash, outcome.proof.proof_hash);
        assert_eq!(request.rule_set_id, "web3-social-v1");
        assert!(request.is_valid);
        assert_eq!(request.metadata["domain"], "social_content");
        assert_eq!(request.metadata["timestamp"], outcome.proof.timestamp);
    }

    #[test]
    fn test_every_domain_has_capabilities() {
        for domain in ValidationDomain::ALL {
            assert!(!domain.capabilities().is_empty());
        }
    }
}
