//! Research-integrity screening of scientific content.

use serde_json::{json, Value};

use super::patterns::{count_citations, count_suspicious_phrases};
use super::{check, into_details, text_field, ValidationContext, Validator};
use crate::ruleset::Parameters;
use crate::types::{ValidationDomain, Verdict};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
const CONFIDENCE: f64 = 0.85;

/// Screens `content` and `title` for boilerplate and citation density.
///
/// Parameters: `similarityThreshold` (default 0.8), `checkCitations`
/// (default true), `minWordCount` (warning only).
#[derive(Debug, Clone, Copy, Default)]
pub struct ResearchIntegrityValidator;

impl Validator for ResearchIntegrityValidator {
    fn domain(&self) -> ValidationDomain {
        ValidationDomain::ResearchIntegrity
    }

    fn validate(&self, payload: &Value, parameters: &Parameters, _context: &ValidationContext) -> Verdict {
        let (Some(content), Some(_title)) = (text_field(payload, "content"), text_field(payload, "title")) else {
            return Verdict::input_defect("Missing content or title");
        };

        let threshold = parameters
            .number("similarityThreshold")
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let plagiarism = plagiarism_score(content);
        let is_valid = plagiarism < threshold;

        let words = word_count(content);
        let mut details = into_details(json!({
            "plagiarismScore": plagiarism,
            "threshold": threshold,
            "wordCount": words,
        }));

        let citation_check = if parameters.flag("checkCitations").unwrap_or(true) {
            let citations = citation_score(content);
            details.insert("citationScore".to_string(), json!(citations));
            Value::from(if citations > 0.5 { "passed" } else { "warning" })
        } else {
            Value::from("skipped")
        };

        details.insert(
            "checks".to_string(),
            json!({
                "plagiarismDetection": check(is_valid),
                "citationAnalysis": citation_check,
            }),
        );

        if let Some(min_words) = parameters.number("minWordCount") {
            if (words as f64) < min_words {
                details.insert("flags".to_string(), json!(["below_min_word_count"]));
            }
        }

        Verdict::new(is_valid, CONFIDENCE, details)
    }
}

/// Space-separated token count.
fn word_count(content: &str) -> usize {
    content.split(' ').count()
}

/// Suspicious phrase count / 10, capped at 1.
fn plagiarism_score(content: &str) -> f64 {
    (count_suspicious_phrases(content) as f64 / 10.0).min(1.0)
}

/// Citations per 100 words, capped at 1.
fn citation_score(content: &str) -> f64 {
    let citations = count_citations(content) as f64;
    (citations * 100.0 / word_count(content) as f64).min(1.0)
}
