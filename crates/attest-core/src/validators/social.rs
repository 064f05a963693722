//! Social-content moderation.

use serde_json::{json, Value};
use std::collections::HashSet;

use super::patterns::{count_emoji, count_links, toxic_keywords_in};
use super::{check, into_details, text_field, ValidationContext, Validator};
use crate::ruleset::Parameters;
use crate::types::{ValidationDomain, Verdict};

const DEFAULT_TOXICITY_THRESHOLD: f64 = 0.8;
const DEFAULT_SPAM_THRESHOLD: f64 = 0.7;
const CONFIDENCE: f64 = 0.9;

/// Screens `content` for toxicity and spam. The two checks are independent:
/// either one failing fails the verdict.
///
/// Parameters: `toxicityThreshold` (default 0.8), `spamThreshold` (default
/// 0.7), `checkSpam` (default true), `allowAppeal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialContentValidator;

impl Validator for SocialContentValidator {
    fn domain(&self) -> ValidationDomain {
        ValidationDomain::SocialContent
    }

    fn validate(&self, payload: &Value, parameters: &Parameters, _context: &ValidationContext) -> Verdict {
        let Some(content) = text_field(payload, "content") else {
            return Verdict::input_defect("No content provided");
        };

        let toxicity_threshold = parameters
            .number("toxicityThreshold")
            .unwrap_or(DEFAULT_TOXICITY_THRESHOLD);
        let spam_threshold = parameters.number("spamThreshold").unwrap_or(DEFAULT_SPAM_THRESHOLD);
        let check_spam = parameters.flag("checkSpam").unwrap_or(true);

        let toxicity = toxicity_score(content);
        let spam = if check_spam { spam_score(content) } else { 0.0 };

        let toxicity_passed = toxicity < toxicity_threshold;
        let spam_passed = spam < spam_threshold;
        let is_valid = toxicity_passed && spam_passed;

        let mut flags = Vec::new();
        if !toxicity_passed {
            flags.push("toxicity_threshold_exceeded");
        }
        if !spam_passed {
            flags.push("spam_threshold_exceeded");
        }

        let mut details = into_details(json!({
            "toxicityScore": toxicity,
            "spamScore": spam,
            "toxicityThreshold": toxicity_threshold,
            "spamThreshold": spam_threshold,
            "contentLength": content.chars().count(),
            "toxicKeywords": toxic_keywords_in(content),
            "checks": {
                "toxicityDetection": check(toxicity_passed),
                "spamDetection": if check_spam { check(spam_passed) } else { Value::from("skipped") },
            },
        }));
        if !flags.is_empty() {
            details.insert("flags".to_string(), json!(flags));
        }
        if let Some(allow_appeal) = parameters.flag("allowAppeal") {
            details.insert("appealable".to_string(), json!(!is_valid && allow_appeal));
        }

        Verdict::new(is_valid, CONFIDENCE, details)
    }
}

/// (toxic keyword hits + [capitals ratio > 0.5]) / 5, capped at 1.
pub fn toxicity_score(content: &str) -> f64 {
    let mut hits = toxic_keywords_in(content).len();

    let length = content.chars().count();
    if length > 0 {
        let capitals = content.chars().filter(char::is_ascii_uppercase).count();
        if capitals as f64 / length as f64 > 0.5 {
            hits += 1;
        }
    }

    (hits as f64 / 5.0).min(1.0)
}

/// 0.5 * repetition + 0.3 * [links > 3] + 0.2 * [emoji > 10% of length],
/// capped at 1.
pub fn spam_score(content: &str) -> f64 {
    let mut score = 0.0;

    let words: Vec<&str> = content.split_whitespace().collect();
    if !words.is_empty() {
        let unique: HashSet<&str> = words.iter().copied().collect();
        let repetition = 1.0 - unique.len() as f64 / words.len() as f64;
        score += repetition * 0.5;
    }

    if count_links(content) > 3 {
        score += 0.3;
    }

    if count_emoji(content) as f64 > content.chars().count() as f64 * 0.1 {
        score += 0.2;
    }

    f64::min(score, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::RuleSetRegistry;

    fn run_with(payload: Value, tweak: impl FnOnce(Parameters) -> Parameters) -> Verdict {
        let registry = RuleSetRegistry::with_defaults();
        let rule_set = registry.get("web3-social-v1").unwrap();
        let context = ValidationContext::new(&rule_set);
        SocialContentValidator.validate(&payload, &tweak(rule_set.parameters.clone()), &context)
    }

    fn run(payload: Value) -> Verdict {
        run_with(payload, |p| p)
    }

    #[test]
    fn test_missing_content_is_input_defect() {
        let verdict = run(json!({ "author": "0xabc" }));
        assert!(!verdict.is_valid);
        assert_eq!(verdict.details["error"], "No content provided");
    }

    #[test]
    fn test_friendly_post_passes() {
        let verdict = run(json!({ "content": "Shipping the new governance module this week, feedback welcome!" }));
        assert!(verdict.is_valid);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.details["toxicityScore"], 0.0);
        assert!(verdict.flags().is_empty());
    }

    #[test]
    fn test_toxicity_alone_fails() {
        let verdict = run(json!({ "content": "HATE TOXIC ABUSE THREAT" }));

        assert!(!verdict.is_valid);
        assert_eq!(verdict.details["toxicityScore"], 1.0);
        assert_eq!(verdict.details["spamScore"], 0.0);
        assert_eq!(verdict.details["checks"]["toxicityDetection"], "failed");
        assert_eq!(verdict.details["checks"]["spamDetection"], "passed");
        assert_eq!(verdict.flags(), vec!["toxicity_threshold_exceeded"]);
        assert_eq!(verdict.details["appealable"], true);
    }

    #[test]
    fn test_spam_alone_fails() {
        let content = "buy buy buy buy buy https://a.io https://b.io https://c.io https://d.io";
        let spam = spam_score(content);
        // 9 words, 5 unique -> repetition 4/9; plus the link bonus
        assert!((spam - (4.0 / 9.0 * 0.5 + 0.3)).abs() < 1e-9);

        let verdict = run_with(json!({ "content": content }), |p| p.with("spamThreshold", 0.5));
        assert!(!verdict.is_valid);
        assert_eq!(verdict.details["checks"]["toxicityDetection"], "passed");
        assert_eq!(verdict.flags(), vec!["spam_threshold_exceeded"]);
    }

    #[test]
    fn test_spam_check_can_be_disabled() {
        let verdict = run_with(
            json!({ "content": "buy buy buy buy buy buy buy buy" }),
            |p| p.with("checkSpam", false).with("spamThreshold", 0.1),
        );
        assert!(verdict.is_valid);
        assert_eq!(verdict.details["checks"]["spamDetection"], "skipped");
    }

    #[test]
    fn test_emoji_density() {
        assert!((spam_score("🚀🚀🚀") - (0.5 * (1.0 - 1.0 / 1.0) + 0.2)).abs() < 1e-9);
        assert_eq!(spam_score("gm frens"), 0.0);
    }

    #[test]
    fn test_shouting_counts_toward_toxicity() {
        assert_eq!(toxicity_score("WHY WOULD YOU DO THIS"), 0.2);
        assert_eq!(toxicity_score("why would you do this"), 0.0);
    }
}
