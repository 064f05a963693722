//! Compliance / KYC screening of wallet identifiers.

use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};

use super::patterns::address_format;
use super::{check, into_details, text_field, ValidationContext, Validator};
use crate::ruleset::Parameters;
use crate::types::{ValidationDomain, Verdict};

const DEFAULT_RISK_THRESHOLD: f64 = 0.7;
const CONFIDENCE: f64 = 0.9;

/// Detail key marking a sanctions hit. AI assessments never override it.
pub const SANCTIONS_MATCH: &str = "sanctionsMatch";

/// Sanctioned wallet identifiers, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanctionsList {
    addresses: HashSet<String>,
}

impl SanctionsList {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(&address.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl Default for SanctionsList {
    /// Demonstration list; not a real sanctions dataset.
    fn default() -> Self {
        Self::new([
            "0x1234567890123456789012345678901234567890",
            "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd",
        ])
    }
}

/// Screens `walletAddress` against a sanctions list and a pseudo-risk score.
///
/// Parameters: `checkOFAC` (default true), `riskThreshold` (default 0.7),
/// `requireDocuments` (default false).
#[derive(Debug, Clone, Default)]
pub struct ComplianceValidator {
    sanctions: SanctionsList,
}

impl ComplianceValidator {
    pub fn new(sanctions: SanctionsList) -> Self {
        Self { sanctions }
    }
}

impl Validator for ComplianceValidator {
    fn domain(&self) -> ValidationDomain {
        ValidationDomain::Compliance
    }

    fn validate(&self, payload: &Value, parameters: &Parameters, context: &ValidationContext) -> Verdict {
        let Some(address) = text_field(payload, "walletAddress") else {
            return Verdict::input_defect("No wallet address provided");
        };

        let check_ofac = parameters.flag("checkOFAC").unwrap_or(true);
        if check_ofac && self.sanctions.contains(address) {
            tracing::debug!(rule_set_id = %context.rule_set_id, "sanctions match");
            return Verdict::new(
                false,
                1.0,
                into_details(json!({
                    "reason": "Address found on OFAC sanctions list",
                    "sanctionType": "OFAC",
                    SANCTIONS_MATCH: true,
                    "flags": ["ofac_sanctions_match"],
                })),
            );
        }

        let risk_threshold = parameters.number("riskThreshold").unwrap_or(DEFAULT_RISK_THRESHOLD);
        let risk = risk_score(address);
        let risk_passed = risk < risk_threshold;

        let format = address_format(address);
        let mut flags = Vec::new();
        if format == "unknown" {
            flags.push("unrecognized_address_format");
        }

        let require_documents = parameters.flag("requireDocuments").unwrap_or(false);
        let documents_present = payload
            .get("documents")
            .and_then(Value::as_array)
            .is_some_and(|docs| !docs.is_empty());
        let documents_passed = !require_documents || documents_present;
        if !documents_passed {
            flags.push("missing_documents");
        }

        let history = payload
            .get("transactionHistory")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut details = into_details(json!({
            "riskScore": risk,
            "riskThreshold": risk_threshold,
            "addressValidation": {
                "isValid": format != "unknown",
                "format": format,
            },
            "additionalRiskFactors": {
                "accountAge": account_age(address),
                "transactionVolume": history.len(),
                "diversityScore": diversity_score(history),
            },
            "checks": {
                "ofacSanctions": if check_ofac { check(true) } else { Value::from("skipped") },
                "riskAssessment": check(risk_passed),
                "documentation": if require_documents { check(documents_passed) } else { Value::from("skipped") },
            },
        }));
        if !flags.is_empty() {
            details.insert("flags".to_string(), json!(flags));
        }

        Verdict::new(risk_passed && documents_passed, CONFIDENCE, details)
    }
}

/// Deterministic pseudo-risk in [0, 0.99] from the last four characters.
///
/// The leading hex digits of the tail are read as a number, mod 100, / 100.
/// A tail with no leading hex digit falls back to its byte sum.
pub fn risk_score(address: &str) -> f64 {
    let tail = tail_chars(address, 4);
    let value = leading_hex(&tail)
        .unwrap_or_else(|| tail.bytes().map(u64::from).sum());
    (value % 100) as f64 / 100.0
}

/// Rough account age in days from the last eight hex digits.
fn account_age(address: &str) -> u64 {
    leading_hex(&tail_chars(address, 8)).unwrap_or(0) / 1_000_000
}

/// Unique counterparties over transaction count; 0 for no history.
fn diversity_score(history: &[Value]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }

    let counterparties: BTreeSet<Option<String>> = history
        .iter()
        .map(|tx| {
            counterparty(tx, "to")
                .or_else(|| counterparty(tx, "from"))
        })
        .collect();

    counterparties.len() as f64 / history.len() as f64
}

fn counterparty(tx: &Value, key: &str) -> Option<String> {
    match tx.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.to_lowercase()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

fn leading_hex(s: &str) -> Option<u64> {
    let digits: String = s.chars().take_while(char::is_ascii_hexdigit).collect();
    if digits.is_empty() {
        None
    } else {
        u64::from_str_radix(&digits, 16).ok()
    }
}
