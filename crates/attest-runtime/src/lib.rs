//! # attest-runtime
//!
//! AI-assisted validation on top of `attest-core`.
//!
//! The core is deterministic and never makes network calls. This crate adds:
//! - a [`ValidationEngine`] that lets a completion model decide, per domain,
//!   with the heuristic verdict as fallback
//! - concurrent batch validation with per-item failure isolation
//! - a per-domain circuit breaker and an assessment cache
//! - YAML runtime configuration and an outbound attestation hook
//!
//! ## Important
//!
//! AI failures never reach the caller. A timeout, provider error or open
//! circuit yields the heuristic verdict with `fallbackUsed: true` in its
//! details.
//!
//! ## Example
//!
//! ```rust,ignore
//! use attest_runtime::{RuntimeConfig, ValidationEngine};
//! use attest_core::{ValidationDomain, ValidationRequest};
//! use serde_json::json;
//!
//! let config = RuntimeConfig::from_file("attest.yaml")?;
//! let engine = ValidationEngine::from_config(&config)?;
//!
//! let outcome = engine
//!     .validate(ValidationRequest::with_default_rule_set(
//!         ValidationDomain::SocialContent,
//!         json!({ "content": "gm frens" }),
//!     ))
//!     .await?;
//! ```

pub mod agents;
pub mod assessment;
pub mod attestation;
pub mod cache;
pub mod capability;
pub mod completion;
pub mod config;
pub mod engine;
pub mod prompts;
pub mod resilience;

#[cfg(test)]
mod testing;

pub use agents::{AgentError, AgentRegistry, AgentRequest, PromptAgent, ValidationAgent};
pub use assessment::{parse_structured, AiAssessment};
pub use attestation::{attest, AttestationError, Attestor, RecordingAttestor};
pub use cache::{AssessmentCache, CacheKey};
pub use capability::{AiCapability, CapabilityError};
pub use config::{CacheConfig, CapabilityConfig, ConfigError, ProviderConfig, RuntimeConfig};
pub use engine::{DomainCapabilities, EngineError, ValidationEngine, ValidationEngineBuilder};
pub use completion::{connect, CompletionBackend, ProviderError, Sampling};
pub use resilience::{Admission, CircuitBreaker, CircuitBreakerConfig, CircuitState, DomainHealth};

#[cfg(feature = "openai")]
pub use completion::OpenAiClient;
