//! AI assessment agents.
//!
//! One agent per domain, held in an [`AgentRegistry`] built at startup and
//! handed to the engine. A domain without an agent is validated by its
//! heuristic validator alone.

mod prompt_agent;
mod traits;

pub use prompt_agent::PromptAgent;
pub use traits::{AgentError, AgentRequest, ValidationAgent};

use attest_core::ValidationDomain;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capability::AiCapability;

/// Agents keyed by domain.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<ValidationDomain, Arc<dyn ValidationAgent>>,
}

impl AgentRegistry {
    /// No agents: heuristics only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A prompt agent for every domain, sharing one capability.
    pub fn standard(capability: Arc<AiCapability>) -> Self {
        ValidationDomain::ALL
            .into_iter()
            .fold(Self::empty(), |registry, domain| {
                registry.with(Arc::new(PromptAgent::new(domain, capability.clone())))
            })
    }

    /// Add an agent, replacing any for the same domain.
    pub fn with(mut self, agent: Arc<dyn ValidationAgent>) -> Self {
        self.agents.insert(agent.domain(), agent);
        self
    }

    pub fn without(mut self, domain: ValidationDomain) -> Self {
        self.agents.remove(&domain);
        self
    }

    pub fn get(&self, domain: ValidationDomain) -> Option<Arc<dyn ValidationAgent>> {
        self.agents.get(&domain).cloned()
    }

    pub fn domains(&self) -> Vec<ValidationDomain> {
        self.agents.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("domains", &self.domains())
            .finish()
    }
}
