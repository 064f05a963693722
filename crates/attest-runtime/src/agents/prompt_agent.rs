//! The prompt-driven agent used for every domain.

use async_trait::async_trait;
use attest_core::{Details, ValidationDomain};
use serde_json::{json, Value};
use std::sync::Arc;

use super::traits::{AgentError, AgentRequest, ValidationAgent};
use crate::assessment::AiAssessment;
use crate::capability::AiCapability;
use crate::prompts::{build_prompt, system_prompt, task_prompt};
use crate::completion::Sampling;

/// Payload field the task prompt cannot do without, per domain.
fn required_field(domain: ValidationDomain) -> &'static str {
    match domain {
        ValidationDomain::Compliance => "walletAddress",
        ValidationDomain::ResearchIntegrity => "content",
        ValidationDomain::SensorTelemetry => "sensorId",
        ValidationDomain::SocialContent => "content",
    }
}

/// Per-domain adjustments to the capability's default sampling.
fn domain_sampling(domain: ValidationDomain, base: &Sampling) -> Sampling {
    let mut sampling = base.clone();
    match domain {
        ValidationDomain::ResearchIntegrity => sampling.max_tokens = sampling.max_tokens.max(1500),
        ValidationDomain::SensorTelemetry => sampling.temperature = 0.2,
        ValidationDomain::Compliance | ValidationDomain::SocialContent => {}
    }
    sampling
}

/// Renders the domain's prompts and asks the capability.
pub struct PromptAgent {
    domain: ValidationDomain,
    capability: Arc<AiCapability>,
    sampling: Sampling,
}

impl PromptAgent {
    pub fn new(domain: ValidationDomain, capability: Arc<AiCapability>) -> Self {
        let sampling = domain_sampling(domain, capability.sampling());
        Self {
            domain,
            capability,
            sampling,
        }
    }

    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    /// The user prompt sent for a request.
    pub fn render(&self, request: &AgentRequest<'_>) -> String {
        let mut context = Details::new();
        context.insert("ruleSetId".to_string(), json!(request.context.rule_set_id));
        context.insert("domain".to_string(), json!(self.domain.as_str()));
        context.insert(
            "parameters".to_string(),
            serde_json::to_value(request.parameters).unwrap_or(Value::Null),
        );
        if !request.metadata.is_empty() {
            context.insert("metadata".to_string(), Value::Object(request.metadata.clone()));
        }

        build_prompt(&task_prompt(self.domain, request.payload), &context)
    }
}

#[async_trait]
impl ValidationAgent for PromptAgent {
    fn domain(&self) -> ValidationDomain {
        self.domain
    }

    fn model(&self) -> &str {
        &self.sampling.model
    }

    async fn assess(&self, request: AgentRequest<'_>) -> Result<AiAssessment, AgentError> {
        let field = required_field(self.domain);
        if request.payload.get(field).map_or(true, Value::is_null) {
            return Err(AgentError::InvalidPayload(format!("missing {}", field)));
        }

        let prompt = self.render(&request);
        let assessment = self
            .capability
            .assess(&prompt, system_prompt(self.domain), &self.sampling)
            .await?;
        Ok(assessment)
    }
}

impl std::fmt::Debug for PromptAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptAgent")
            .field("domain", &self.domain)
            .field("sampling", &self.sampling)
            .finish()
    }
}
