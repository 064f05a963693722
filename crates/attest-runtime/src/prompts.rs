//! Prompts for the domain assessment agents.
//!
//! Each domain has a fixed system prompt that pins the JSON reply shape, and
//! a task prompt rendered from the payload. [`build_prompt`] prefixes the
//! task with the rule-set context.

use attest_core::{Details, ValidationDomain};
use serde_json::Value;

/// Compliance / KYC analyst.
pub const COMPLIANCE_SYSTEM_PROMPT: &str = r#"You are an expert KYC (Know Your Customer) compliance analyst for DeFi protocols.
Your role is to assess wallet addresses and transaction patterns for compliance with financial regulations.

You must analyze:
1. OFAC sanctions list compliance
2. Risk assessment based on transaction patterns
3. Geographic restrictions
4. AML (Anti-Money Laundering) indicators

Respond in JSON format with:
{
  "isValid": boolean,
  "confidence": number (0-1),
  "reasoning": "detailed explanation",
  "details": {
    "riskScore": number (0-1),
    "ofacStatus": "clear|flagged|unknown",
    "amlFlags": ["flag1", "flag2"],
    "geographicRisk": "low|medium|high"
  },
  "flags": ["any warnings or concerns"]
}"#;

/// Research-integrity analyst.
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"You are an expert academic integrity analyst specializing in plagiarism detection for scientific research.
Your role is to analyze research papers, abstracts, and scientific content for originality and proper attribution.

You must analyze:
1. Text similarity to known sources
2. Citation quality and completeness
3. Paraphrasing vs. direct copying
4. Academic writing standards
5. Research methodology originality

Respond in JSON format with:
{
  "isValid": boolean,
  "confidence": number (0-1),
  "reasoning": "detailed explanation",
  "details": {
    "plagiarismScore": number (0-1),
    "citationQuality": "poor|fair|good|excellent",
    "originalityScore": number (0-1),
    "suspiciousPatterns": ["pattern1", "pattern2"],
    "recommendedActions": ["action1", "action2"]
  },
  "flags": ["any concerns or warnings"]
}"#;

/// Sensor-telemetry analyst.
pub const SENSOR_SYSTEM_PROMPT: &str = r#"You are an expert IoT sensor data analyst specializing in anomaly detection for DePIN (Decentralized Physical Infrastructure) networks.
Your role is to validate sensor readings and detect anomalies in IoT device data.

You must analyze:
1. Data consistency and patterns
2. Anomaly detection in sensor readings
3. Temporal patterns and trends
4. Cross-sensor validation
5. Physical plausibility of measurements

Respond in JSON format with:
{
  "isValid": boolean,
  "confidence": number (0-1),
  "reasoning": "detailed explanation",
  "details": {
    "anomalyScore": number (0-1),
    "dataQuality": "poor|fair|good|excellent",
    "temporalConsistency": number (0-1),
    "physicalPlausibility": number (0-1),
    "recommendedActions": ["action1", "action2"]
  },
  "flags": ["any anomalies or concerns"]
}"#;

/// Social-content moderator.
pub const SOCIAL_SYSTEM_PROMPT: &str = r#"You are an expert content moderation analyst for Web3 social platforms.
Your role is to analyze user-generated content for toxicity, spam, harassment, and policy violations.

You must analyze:
1. Toxicity and harmful language
2. Spam and promotional content
3. Harassment and bullying
4. Misinformation and false claims
5. Community guidelines compliance

Respond in JSON format with:
{
  "isValid": boolean,
  "confidence": number (0-1),
  "reasoning": "detailed explanation",
  "details": {
    "toxicityScore": number (0-1),
    "spamScore": number (0-1),
    "harassmentScore": number (0-1),
    "contentCategory": "safe|warning|violation",
    "recommendedActions": ["action1", "action2"]
  },
  "flags": ["specific violations or concerns"]
}"#;

pub fn system_prompt(domain: ValidationDomain) -> &'static str {
    match domain {
        ValidationDomain::Compliance => COMPLIANCE_SYSTEM_PROMPT,
        ValidationDomain::ResearchIntegrity => RESEARCH_SYSTEM_PROMPT,
        ValidationDomain::SensorTelemetry => SENSOR_SYSTEM_PROMPT,
        ValidationDomain::SocialContent => SOCIAL_SYSTEM_PROMPT,
    }
}

/// Render the task prompt for a payload.
pub fn task_prompt(domain: ValidationDomain, payload: &Value) -> String {
    match domain {
        ValidationDomain::Compliance => compliance_task(payload),
        ValidationDomain::ResearchIntegrity => research_task(payload),
        ValidationDomain::SensorTelemetry => sensor_task(payload),
        ValidationDomain::SocialContent => social_task(payload),
    }
}

/// Prefix a task with `key: json` context lines.
pub fn build_prompt(task: &str, context: &Details) -> String {
    if context.is_empty() {
        return task.to_string();
    }

    let lines: Vec<String> = context
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    format!("Context:\n{}\n\nTask:\n{}", lines.join("\n"), task)
}

fn compliance_task(payload: &Value) -> String {
    format!(
        "Analyze this wallet address for KYC compliance:\n\n\
         Wallet Address: {}\n\
         Transaction History: {}\n\
         User Information: {}\n\n\
         Please assess:\n\
         1. Is this address on any sanctions lists?\n\
         2. What is the risk level based on transaction patterns?\n\
         3. Are there any AML red flags?\n\
         4. What is the overall compliance status?\n\n\
         Provide a thorough analysis with specific reasoning for your decision.",
        text(payload, "walletAddress", ""),
        json(payload, "transactionHistory", "\"Not provided\""),
        json(payload, "userInfo", "\"Not provided\""),
    )
}

fn research_task(payload: &Value) -> String {
    format!(
        "Analyze this scientific content for plagiarism and academic integrity:\n\n\
         Title: {}\n\
         Abstract: {}\n\
         Content: {}\n\
         Citations: {}\n\
         Authors: {}\n\n\
         Please assess:\n\
         1. Is the content original or does it show signs of plagiarism?\n\
         2. Are citations properly formatted and complete?\n\
         3. Is the writing style consistent throughout?\n\
         4. Are there any suspicious patterns or red flags?\n\
         5. What is the overall academic integrity score?\n\n\
         Provide specific examples and reasoning for your assessment.",
        text(payload, "title", "Not provided"),
        text(payload, "abstract", "Not provided"),
        text(payload, "content", ""),
        json(payload, "citations", "[]"),
        json(payload, "authors", "[]"),
    )
}

fn sensor_task(payload: &Value) -> String {
    let readings = match payload.get("readings") {
        Some(readings) if !readings.is_null() => readings.to_string(),
        _ => json(payload, "reading", "[]"),
    };

    format!(
        "Analyze this IoT sensor data for anomalies and validity:\n\n\
         Sensor ID: {}\n\
         Sensor Type: {}\n\
         Location: {}\n\
         Timestamp: {}\n\
         Readings: {}\n\
         Metadata: {}\n\n\
         Please assess:\n\
         1. Are the sensor readings within expected ranges?\n\
         2. Do the readings show consistent patterns over time?\n\
         3. Are there any anomalies or outliers?\n\
         4. Is the data physically plausible for this sensor type?\n\
         5. What is the overall data quality score?\n\n\
         Consider factors like sensor calibration, environmental conditions, and typical measurement ranges.",
        text(payload, "sensorId", ""),
        text(payload, "sensorType", "Unknown"),
        text(payload, "location", "Unknown"),
        text(payload, "timestamp", "Not provided"),
        readings,
        json(payload, "metadata", "{}"),
    )
}

fn social_task(payload: &Value) -> String {
    format!(
        "Analyze this social media content for moderation:\n\n\
         Content: \"{}\"\n\
         Author: {}\n\
         Platform: {}\n\
         Content Type: {}\n\
         Metadata: {}\n\n\
         Please assess:\n\
         1. Does the content contain toxic, harmful, or offensive language?\n\
         2. Is this spam or unwanted promotional content?\n\
         3. Does it contain harassment, bullying, or threats?\n\
         4. Are there any policy violations or inappropriate content?\n\
         5. What moderation action would you recommend?\n\n\
         Be thorough but fair in your analysis, considering context and intent.",
        text(payload, "content", ""),
        text(payload, "author", "Anonymous"),
        text(payload, "platform", "Unknown"),
        text(payload, "contentType", "post"),
        json(payload, "metadata", "{}"),
    )
}

/// Field as display text: strings unquoted, other scalars via JSON.
fn text(payload: &Value, key: &str, default: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None | Some(Value::String(_)) => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Field as compact JSON.
fn json(payload: &Value, key: &str, default: &str) -> String {
    match payload.get(key) {
        Some(Value::Null) | None => default.to_string(),
        Some(value) => value.to_string(),
    }
}
