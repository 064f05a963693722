//! Structured reading of free-form model replies.
//!
//! Parsing is a two-stage chain, and both stages are total:
//!
//! 1. Strict JSON: the reply (minus a surrounding markdown fence) must be a
//!    JSON object. Missing fields take defaults.
//! 2. Line scan: valid/invalid markers, a `confidence:` number, and any line
//!    mentioning "flag" or "warning" kept verbatim as a flag.

use attest_core::{clamp_confidence, Details};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence when a free-text reply states none.
const DEFAULT_TEXT_CONFIDENCE: f64 = 0.5;

lazy_static! {
    static ref CONFIDENCE_PATTERN: Regex =
        Regex::new(r"(?i)confidence[:\s]+(\d+\.?\d*)").unwrap();

    static ref VALID_MARKER: Regex =
        Regex::new(r"(?i)\bvalid:\s*true\b|\bapproved\b").unwrap();

    static ref INVALID_MARKER: Regex =
        Regex::new(r"(?i)\bvalid:\s*false\b|\brejected\b").unwrap();

    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$").unwrap();
}

/// A model's decision on one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAssessment {
    pub is_valid: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub details: Details,
    pub flags: Vec<String>,
}

/// Parse a model reply. Never fails.
pub fn parse_structured(text: &str) -> AiAssessment {
    parse_json(text).unwrap_or_else(|| parse_text(text))
}

/// Stage one: a JSON object, optionally fenced.
pub fn parse_json(text: &str) -> Option<AiAssessment> {
    let body = strip_code_fence(text);
    let Value::Object(object) = serde_json::from_str::<Value>(body).ok()? else {
        return None;
    };

    let is_valid = object.get("isValid").and_then(Value::as_bool).unwrap_or(false);
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .map(clamp_confidence)
        .unwrap_or(0.0);
    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text.to_string());
    let details = match object.get("details") {
        Some(Value::Object(details)) => details.clone(),
        _ => Details::new(),
    };
    let flags = object
        .get("flags")
        .and_then(Value::as_array)
        .map(|flags| {
            flags
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Some(AiAssessment {
        is_valid,
        confidence,
        reasoning,
        details,
        flags,
    })
}

/// Stage two: line-oriented extraction. Later markers win.
pub fn parse_text(text: &str) -> AiAssessment {
    let mut is_valid = false;
    let mut confidence = DEFAULT_TEXT_CONFIDENCE;
    let mut flags = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();

        if VALID_MARKER.is_match(line) {
            is_valid = true;
        }
        // A rejection on the same line overrides the approval.
        if INVALID_MARKER.is_match(line) {
            is_valid = false;
        }

        if let Some(value) = CONFIDENCE_PATTERN
            .captures(line)
            .and_then(|c| c[1].parse::<f64>().ok())
        {
            confidence = if value > 1.0 { value / 100.0 } else { value };
        }

        if lower.contains("flag") || lower.contains("warning") {
            flags.push(line.to_string());
        }
    }

    AiAssessment {
        is_valid,
        confidence: clamp_confidence(confidence),
        reasoning: text.to_string(),
        details: Details::new(),
        flags,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_json_object() {
        let reply = r#"{"isValid": true, "confidence": 0.82, "reasoning": "clean history",
            "details": {"riskScore": 0.1, "ofacStatus": "clear"}, "flags": []}"#;

        let assessment = parse_structured(reply);
        assert!(assessment.is_valid);
        assert_eq!(assessment.confidence, 0.82);
        assert_eq!(assessment.reasoning, "clean history");
        assert_eq!(assessment.details["ofacStatus"], "clear");
        assert!(assessment.flags.is_empty());
    }

    #[test]
    fn test_fenced_json() {
        let reply = "```json\n{\"isValid\": false, \"confidence\": 0.7, \"flags\": [\"mixer_exposure\"]}\n```";

        let assessment = parse_structured(reply);
        assert!(!assessment.is_valid);
        assert_eq!(assessment.flags, vec!["mixer_exposure"]);
        // No reasoning field: the raw reply stands in
        assert_eq!(assessment.reasoning, reply);
    }

    #[test]
    fn test_json_defaults() {
        let assessment = parse_json("{}").unwrap();
        assert!(!assessment.is_valid);
        assert_eq!(assessment.confidence, 0.0);
        assert!(assessment.details.is_empty());
    }

    #[test]
    fn test_json_confidence_clamped() {
        assert_eq!(parse_json(r#"{"confidence": 7}"#).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_non_object_json_falls_through_to_text() {
        assert!(parse_json("[1, 2]").is_none());
        assert!(parse_json("true").is_none());

        let assessment = parse_structured("42");
        assert_eq!(assessment.confidence, DEFAULT_TEXT_CONFIDENCE);
        assert_eq!(assessment.reasoning, "42");
    }

    #[test]
    fn test_free_text_markers() {
        let reply = "Assessment complete.\nValid: true\nConfidence: 85\nWarning: new account\nFlag: high velocity";

        let assessment = parse_structured(reply);
        assert!(assessment.is_valid);
        assert!((assessment.confidence - 0.85).abs() < 1e-9);
        assert_eq!(assessment.flags, vec!["Warning: new account", "Flag: high velocity"]);
        assert_eq!(assessment.reasoning, reply);
    }

    #[test]
    fn test_later_marker_wins() {
        assert!(!parse_text("approved at first glance\nthen rejected on review").is_valid);
        assert!(parse_text("valid: false\nvalid: true").is_valid);
        assert!(!parse_text("approved by the first pass, rejected by the second").is_valid);
    }

    #[test]
    fn test_markers_match_whole_words() {
        assert!(!parse_text("invalid: true").is_valid);
        assert!(!parse_text("unapproved source").is_valid);
        assert!(parse_text("Valid:true").is_valid);
        assert!(parse_text("valid: false\ninvalid: false, approved").is_valid);
    }

    #[test]
    fn test_fractional_confidence_kept() {
        assert_eq!(parse_text("confidence 0.3").confidence, 0.3);
    }

    #[test]
    fn test_empty_reply() {
        let assessment = parse_structured("");
        assert!(!assessment.is_valid);
        assert_eq!(assessment.confidence, DEFAULT_TEXT_CONFIDENCE);
        assert!(assessment.flags.is_empty());
    }

    proptest! {
        #[test]
        fn prop_parse_is_total_and_clamped(reply in ".*") {
            let assessment = parse_structured(&reply);
            prop_assert!((0.0..=1.0).contains(&assessment.confidence));
        }
    }
}
