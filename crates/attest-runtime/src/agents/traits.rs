//! Assessment agent trait and common types.

use async_trait::async_trait;
use attest_core::{Details, Parameters, ValidationContext, ValidationDomain};
use serde_json::Value;
use thiserror::Error;

use crate::assessment::AiAssessment;
use crate::capability::CapabilityError;

/// Errors from assessment agents.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Payload cannot be assessed: {0}")]
    InvalidPayload(String),
}

/// Everything an agent may look at for one request.
#[derive(Debug, Clone, Copy)]
pub struct AgentRequest<'a> {
    pub payload: &'a Value,
    pub parameters: &'a Parameters,
    pub context: &'a ValidationContext,
    pub metadata: &'a Details,
}

/// An AI-backed assessor for one domain.
///
/// Agents hold no per-request state; the engine owns caching, circuit
/// breaking and merging the assessment into the heuristic verdict.
#[async_trait]
pub trait ValidationAgent: Send + Sync {
    /// The domain this agent assesses.
    fn domain(&self) -> ValidationDomain;

    /// Label recorded as `aiModel` in verdict details.
    fn model(&self) -> &str;

    async fn assess(&self, request: AgentRequest<'_>) -> Result<AiAssessment, AgentError>;
}
