//! Request pipeline stages shared by the sync and async entry points.
//!
//! ```text
//! received -> pre_validated -> dispatched -> post_processed -> completed
//!     \______________\______________\______________\-----> failed
//! ```
//!
//! `failed` still produces a well-formed verdict.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use crate::proof::ProofRecord;
use crate::ruleset::{RuleSet, RuleSetRegistry};
use crate::types::{clamp_confidence, PreparedRequest, ValidationOutcome, ValidationRequest, Verdict};
use crate::ValidationError;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Received,
    PreValidated,
    Dispatched,
    PostProcessed,
    Completed,
    Failed,
}

impl RequestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPhase::Received => "received",
            RequestPhase::PreValidated => "pre_validated",
            RequestPhase::Dispatched => "dispatched",
            RequestPhase::PostProcessed => "post_processed",
            RequestPhase::Completed => "completed",
            RequestPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enforce request invariants before dispatch.
///
/// Checks run in order: missing fields, domain parse, empty payload.
pub fn pre_validate(request: &ValidationRequest) -> Result<PreparedRequest, ValidationError> {
    let payload = match &request.payload {
        None | Some(Value::Null) => return Err(ValidationError::MissingField("payload")),
        Some(payload) => payload,
    };
    let rule_set_id = non_blank(request.rule_set_id.as_deref())
        .ok_or(ValidationError::MissingField("ruleSetId"))?;
    let domain = non_blank(request.domain.as_deref())
        .ok_or(ValidationError::MissingField("domain"))?
        .parse()?;

    if is_empty_payload(payload) {
        return Err(ValidationError::EmptyPayload);
    }

    Ok(PreparedRequest {
        payload: payload.clone(),
        rule_set_id: rule_set_id.to_string(),
        domain,
        metadata: request.metadata.clone(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Look up the rule set a prepared request names and check it may be used.
pub fn resolve_rule_set(
    registry: &RuleSetRegistry,
    request: &PreparedRequest,
) -> Result<RuleSet, ValidationError> {
    let rule_set = registry
        .get(&request.rule_set_id)
        .ok_or_else(|| ValidationError::UnknownRuleSet(request.rule_set_id.clone()))?;

    if rule_set.domain != request.domain {
        return Err(ValidationError::DomainMismatch {
            rule_set_id: rule_set.id,
            requested: request.domain,
            actual: rule_set.domain,
        });
    }
    if !rule_set.active {
        return Err(ValidationError::InactiveRuleSet(rule_set.id));
    }

    Ok(rule_set)
}

/// Detail keys owned by the pipeline. Whatever a validator or model put
/// there is replaced during post-validation.
pub const ROUTING_KEYS: [&str; 3] = ["ruleSetId", "domain", "processingTimeMs"];

/// Normalize a validator's verdict.
///
/// Clamps confidence, backfills the timestamp and stamps the routing
/// metadata from the request.
pub fn post_validate(mut verdict: Verdict, request: &PreparedRequest, elapsed: Duration) -> Verdict {
    verdict.confidence = clamp_confidence(verdict.confidence);
    if verdict.timestamp.is_none() {
        verdict.timestamp = Some(chrono::Utc::now());
    }

    let details = &mut verdict.details;
    details.insert("ruleSetId".to_string(), json!(request.rule_set_id));
    details.insert("domain".to_string(), json!(request.domain.as_str()));
    details.insert(
        "processingTimeMs".to_string(),
        json!(elapsed_millis(elapsed)),
    );

    verdict
}

/// Build the failed verdict for a request that stopped at `phase`.
pub fn recover(
    request: &ValidationRequest,
    reason: impl Into<String>,
    phase: RequestPhase,
    elapsed: Duration,
) -> Verdict {
    let mut verdict = Verdict::failure(reason)
        .with_detail("failedAt", json!(phase.as_str()))
        .with_detail("processingTimeMs", json!(elapsed_millis(elapsed)));

    if let Some(rule_set_id) = &request.rule_set_id {
        verdict.details.insert("ruleSetId".to_string(), json!(rule_set_id));
    }
    if let Some(domain) = &request.domain {
        verdict.details.insert("domain".to_string(), json!(domain));
    }

    verdict
}

/// [`recover`] plus the proof record. The hashed payload is the request
/// payload, or `null` when it was missing.
pub fn recover_outcome(
    request: &ValidationRequest,
    reason: impl Into<String>,
    phase: RequestPhase,
    elapsed: Duration,
) -> ValidationOutcome {
    let verdict = recover(request, reason, phase, elapsed);
    let payload = request.payload.clone().unwrap_or(Value::Null);
    let rule_set_id = request.rule_set_id.as_deref().unwrap_or_default();
    let proof = ProofRecord::derive(&payload, &verdict, rule_set_id);
    ValidationOutcome { verdict, proof }
}

pub(crate) fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
