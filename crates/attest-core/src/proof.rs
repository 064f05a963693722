//! Content-addressed proof records.
//!
//! A proof record binds a verdict to the payload it was produced for so
//! that an external attestation layer can later compare hashes. The hashes
//! are fingerprints: they carry no secrecy and authenticate nothing.
//!
//! - `dataHash  = H(canonical(payload))`
//! - `proofHash = H(dataHash ++ isValid ++ ruleSetId ++ timestampMillis)`
//!
//! `H` is SHA-256 rendered as `0x`-prefixed lowercase hex.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::{Details, Verdict};

/// Hashes binding a payload and its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    /// Hash of the canonicalized payload.
    pub data_hash: String,

    /// Hash binding the data hash to the verdict.
    pub proof_hash: String,

    /// Rule set the verdict was produced under.
    pub rule_set_id: String,

    /// Verdict timestamp in Unix milliseconds.
    pub timestamp: i64,
}

impl ProofRecord {
    /// Derive the proof record for a payload and its verdict.
    pub fn derive(payload: &Value, verdict: &Verdict, rule_set_id: &str) -> Self {
        let data_hash = data_hash(payload);
        let timestamp = verdict.timestamp_millis();
        let proof_hash = proof_hash(&data_hash, verdict.is_valid, rule_set_id, timestamp);

        Self {
            data_hash,
            proof_hash,
            rule_set_id: rule_set_id.to_string(),
            timestamp,
        }
    }

    /// Recompute both hashes and compare against this record.
    pub fn verify(&self, payload: &Value, is_valid: bool) -> bool {
        let expected_data = data_hash(payload);
        expected_data == self.data_hash
            && proof_hash(&expected_data, is_valid, &self.rule_set_id, self.timestamp)
                == self.proof_hash
    }
}

/// What an attestation layer needs to record a verdict on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub data_hash: String,
    pub proof_hash: String,
    pub rule_set_id: String,
    pub is_valid: bool,
    pub metadata: Details,
}

/// Serialize a JSON value with object keys sorted at every depth.
///
/// Two structurally equal values always produce the same string regardless
/// of key insertion order.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        // Scalars already have a single textual form.
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_string()).to_string());
}

/// Hash of the canonicalized payload.
pub fn data_hash(payload: &Value) -> String {
    sha256_hex(canonicalize(payload).as_bytes())
}

/// Hash binding a data hash to a verdict.
pub fn proof_hash(data_hash: &str, is_valid: bool, rule_set_id: &str, timestamp_millis: i64) -> String {
    let combined = format!("{}{}{}{}", data_hash, is_valid, rule_set_id, timestamp_millis);
    sha256_hex(combined.as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("0x{}", hex::encode(hasher.finalize()))
}
