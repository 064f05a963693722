//! Sensor-telemetry screening of IoT readings.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{check, into_details, ValidationContext, Validator};
use crate::ruleset::Parameters;
use crate::types::{ValidationDomain, Verdict};

const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.9;
const CONFIDENCE: f64 = 0.8;

/// Readings with |z| above this are anomalous.
const Z_SCORE_LIMIT: f64 = 2.0;

/// Peers agree when strictly closer than this to the latest reading.
const PEER_TOLERANCE: f64 = 5.0;

/// Consensus must exceed this fraction of agreeing peers.
const CONSENSUS_MIN: f64 = 0.6;

const SIMULATED_PEERS: usize = 3;

/// Screens `sensorId` and `readings` for statistical anomalies and peer
/// consensus.
///
/// Parameters: `anomalyThreshold` (default 0.9), `requireConsensus`
/// (default true). `timeWindowMinutes` is reported back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorTelemetryValidator;

impl Validator for SensorTelemetryValidator {
    fn domain(&self) -> ValidationDomain {
        ValidationDomain::SensorTelemetry
    }

    fn validate(&self, payload: &Value, parameters: &Parameters, _context: &ValidationContext) -> Verdict {
        let Some(sensor_id) = sensor_id(payload) else {
            return Verdict::input_defect("Missing sensor ID or readings");
        };
        let readings = match readings(payload) {
            Ok(readings) if !readings.is_empty() => readings,
            Ok(_) => return Verdict::input_defect("Missing sensor ID or readings"),
            Err(reason) => return Verdict::input_defect(reason),
        };

        let threshold = parameters
            .number("anomalyThreshold")
            .unwrap_or(DEFAULT_ANOMALY_THRESHOLD);
        let require_consensus = parameters.flag("requireConsensus").unwrap_or(true);

        let (peers, peer_source) = match peer_readings(payload) {
            Some(peers) => (peers, "payload"),
            None => (simulated_peers(&sensor_id, readings[0]), "simulated"),
        };

        let anomaly = anomaly_ratio(&readings);
        let consensus = consensus_score(&readings, &peers);

        let anomaly_passed = anomaly < threshold;
        let consensus_passed = consensus > CONSENSUS_MIN;
        let is_valid = anomaly_passed && (consensus_passed || !require_consensus);

        let mut details = into_details(json!({
            "anomalyScore": anomaly,
            "consensusScore": consensus,
            "threshold": threshold,
            "readingCount": readings.len(),
            "sensorId": sensor_id,
            "peerSource": peer_source,
            "checks": {
                "anomalyDetection": check(anomaly_passed),
                "consensusValidation": if require_consensus { check(consensus_passed) } else { Value::from("skipped") },
            },
        }));
        if let Some(window) = parameters.number("timeWindowMinutes") {
            details.insert("timeWindowMinutes".to_string(), json!(window));
        }

        Verdict::new(is_valid, CONFIDENCE, details)
    }
}

fn sensor_id(payload: &Value) -> Option<String> {
    match payload.get("sensorId")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `readings` as numbers, or a single `reading` as a one-element sequence.
fn readings(payload: &Value) -> Result<Vec<f64>, &'static str> {
    match (payload.get("readings"), payload.get("reading")) {
        (Some(Value::Array(items)), _) => items
            .iter()
            .map(|v| v.as_f64().ok_or("Readings must be numeric"))
            .collect(),
        (Some(Value::Null) | None, Some(single)) if !single.is_null() => single
            .as_f64()
            .map(|r| vec![r])
            .ok_or("Readings must be numeric"),
        (Some(Value::Null) | None, _) => Ok(Vec::new()),
        (Some(_), _) => Err("Readings must be numeric"),
    }
}

fn peer_readings(payload: &Value) -> Option<Vec<f64>> {
    let peers: Vec<f64> = payload
        .get("peerReadings")?
        .as_array()?
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    (!peers.is_empty()).then_some(peers)
}

/// Fraction of readings whose population z-score exceeds 2.
///
/// Fewer than two readings, or zero spread, means no anomalies.
pub(crate) fn anomaly_ratio(readings: &[f64]) -> f64 {
    if readings.len() < 2 {
        return 0.0;
    }

    let n = readings.len() as f64;
    let mean = readings.iter().sum::<f64>() / n;
    let variance = readings.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return 0.0;
    }

    let anomalies = readings
        .iter()
        .filter(|r| ((*r - mean) / std_dev).abs() > Z_SCORE_LIMIT)
        .count();

    anomalies as f64 / n
}

/// Fraction of peers within tolerance of the latest reading.
fn consensus_score(readings: &[f64], peers: &[f64]) -> f64 {
    let Some(latest) = readings.last() else {
        return 0.0;
    };
    if peers.is_empty() {
        return 0.0;
    }

    let agreeing = peers
        .iter()
        .filter(|p| (*p - latest).abs() < PEER_TOLERANCE)
        .count();
    agreeing as f64 / peers.len() as f64
}

/// Three stand-in peers around `anchor`, offset by at most ±1 and fixed per
/// sensor id.
fn simulated_peers(sensor_id: &str, anchor: f64) -> Vec<f64> {
    let digest = Sha256::digest(sensor_id.as_bytes());
    digest
        .iter()
        .take(SIMULATED_PEERS)
        .map(|b| anchor + (f64::from(*b) / 255.0) * 2.0 - 1.0)
        .collect()
}
