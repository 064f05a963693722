//! Outbound attestation hook.
//!
//! An [`Attestor`] records a verdict's hashes somewhere durable (a chain, a
//! ledger) and returns an opaque transaction id. The engine never requires
//! one; callers submit [`attest_core::ValidationOutcome::attestation_request`]
//! themselves.

use async_trait::async_trait;
use attest_core::{AttestationRequest, ValidationOutcome};
use parking_lot::Mutex;
use thiserror::Error;

/// Errors from an attestation backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttestationError {
    #[error("Attestation rejected: {0}")]
    Rejected(String),

    #[error("Attestation backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Attestor: Send + Sync {
    /// Record a submission; returns the transaction id.
    async fn submit(&self, request: &AttestationRequest) -> Result<String, AttestationError>;
}

/// Submit an outcome's attestation request.
pub async fn attest(
    attestor: &dyn Attestor,
    outcome: &ValidationOutcome,
) -> Result<String, AttestationError> {
    let request = outcome.attestation_request();
    let tx_id = attestor.submit(&request).await?;
    tracing::debug!(
        rule_set_id = %request.rule_set_id,
        proof_hash = %request.proof_hash,
        tx_id = %tx_id,
        "Verdict attested"
    );
    Ok(tx_id)
}

/// Keeps submissions in memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingAttestor {
    records: Mutex<Vec<AttestationRequest>>,
}

impl RecordingAttestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttestationRequest> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl Attestor for RecordingAttestor {
    async fn submit(&self, request: &AttestationRequest) -> Result<String, AttestationError> {
        if !request.proof_hash.starts_with("0x") || !request.data_hash.starts_with("0x") {
            return Err(AttestationError::Rejected("hashes must be 0x-prefixed".to_string()));
        }

        let mut records = self.records.lock();
        records.push(request.clone());
        Ok(format!("0x{:064x}", records.len()))
    }
}
