//! The validation engine.
//!
//! Routes each request through the pipeline
//!
//! ```text
//! received -> pre_validated -> dispatched -> post_processed -> completed
//! ```
//!
//! and, for domains with a registered agent, lets the AI assessment replace
//! the heuristic decision. Any AI failure falls back to the heuristic verdict
//! with `fallbackUsed` set.

use attest_core::validators::SANCTIONS_MATCH;
use attest_core::{
    post_validate, pre_validate, recover, recover_outcome, resolve_rule_set, Details, Parameters,
    PreparedRequest, ProofRecord, RegistryError, RequestPhase, RuleSet, RuleSetConfig, RuleSetFile,
    RuleSetPatch, RuleSetRegistry, SanctionsList, ValidationContext, ValidationDomain,
    ValidationError, ValidationOutcome, ValidationRequest, ValidatorSet, Verdict, ROUTING_KEYS,
};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::agents::{AgentError, AgentRegistry, AgentRequest, ValidationAgent};
use crate::assessment::AiAssessment;
use crate::cache::{AssessmentCache, CacheKey};
use crate::capability::{AiCapability, CapabilityError};
use crate::completion;
use crate::config::{CacheConfig, ConfigError, RuntimeConfig};
use crate::resilience::{Admission, CircuitBreaker, CircuitBreakerConfig, DomainHealth};

/// Errors surfaced to the caller. Input defects and AI failures never show
/// up here; they become verdicts.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Rule set not found: {0}")]
    RuleSetNotFound(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl EngineError {
    /// Whether the caller sent something the engine cannot honor (4xx), as
    /// opposed to a broken engine (5xx).
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::Validation(ValidationError::NoValidator(_)) => false,
            EngineError::Validation(_) | EngineError::RuleSetNotFound(_) | EngineError::Registry(_) => {
                true
            }
        }
    }
}

/// What a domain offers, for discovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCapabilities {
    pub domain: ValidationDomain,
    pub default_rule_set_id: &'static str,
    pub capabilities: Vec<&'static str>,
    pub ai_assisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    pub circuit: DomainHealth,
}

/// Validation engine with optional AI assistance.
pub struct ValidationEngine {
    registry: Arc<RuleSetRegistry>,
    validators: ValidatorSet,
    agents: AgentRegistry,
    circuit_breaker: CircuitBreaker,
    cache: Option<AssessmentCache>,
}

impl ValidationEngine {
    pub fn builder() -> ValidationEngineBuilder {
        ValidationEngineBuilder::new()
    }

    /// Seeded rule sets and heuristic validators, no AI.
    pub fn heuristic() -> Self {
        Self {
            registry: Arc::new(RuleSetRegistry::with_defaults()),
            validators: ValidatorSet::standard(),
            agents: AgentRegistry::empty(),
            circuit_breaker: CircuitBreaker::default(),
            cache: None,
        }
    }

    /// Build everything the config describes.
    ///
    /// AI agents are registered only when the capability is enabled and a
    /// provider is configured.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = RuleSetRegistry::with_defaults();
        if let Some(path) = &config.rule_sets_file {
            let count = RuleSetFile::from_file(path)?.register(&registry)?;
            tracing::info!(path = %path.display(), count, "Loaded rule sets");
        }

        let validators = match &config.sanctions {
            Some(addresses) => ValidatorSet::standard_with_sanctions(SanctionsList::new(addresses)),
            None => ValidatorSet::standard(),
        };

        let capability = &config.capability;
        let agents = match (&capability.provider, capability.enabled) {
            (Some(provider), true) => {
                let backend = completion::connect(provider)?;
                tracing::info!(backend = backend.name(), model = %capability.model, "AI assistance enabled");
                AgentRegistry::standard(Arc::new(AiCapability::new(backend, capability)))
            }
            _ => AgentRegistry::empty(),
        };

        let mut builder = Self::builder()
            .registry(Arc::new(registry))
            .validators(validators)
            .agents(agents)
            .circuit_breaker(config.circuit_breaker.clone());
        if config.cache.enabled {
            builder = builder.cache(config.cache.clone());
        }

        builder.build().map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Validate one request.
    ///
    /// Input defects come back as a failed verdict; unknown or unusable rule
    /// sets and domains come back as [`EngineError`].
    pub async fn validate(&self, request: ValidationRequest) -> Result<ValidationOutcome, EngineError> {
        let started = Instant::now();
        tracing::debug!(
            phase = %RequestPhase::Received,
            rule_set_id = ?request.rule_set_id,
            domain = ?request.domain,
            "Validation request"
        );

        let prepared = match pre_validate(&request) {
            Ok(prepared) => prepared,
            Err(err) if err.is_input_error() => {
                tracing::debug!(phase = %RequestPhase::Failed, error = %err, "Input error recovered");
                return Ok(recover_outcome(
                    &request,
                    err.to_string(),
                    RequestPhase::Received,
                    started.elapsed(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let rule_set = resolve_rule_set(&self.registry, &prepared)?;
        let validator = self.validators.get(prepared.domain).map_err(|err| {
            tracing::error!(domain = %prepared.domain, "No validator registered");
            err
        })?;
        tracing::debug!(
            phase = %RequestPhase::PreValidated,
            domain = %prepared.domain,
            rule_set_id = %rule_set.id,
            "Request accepted"
        );

        let context = ValidationContext::new(&rule_set);
        let heuristic = validator.validate(&prepared.payload, &rule_set.parameters, &context);
        tracing::debug!(phase = %RequestPhase::Dispatched, domain = %prepared.domain, "Heuristic verdict ready");

        let verdict = self.assist(&prepared, &rule_set, &context, heuristic).await;
        let verdict = post_validate(verdict, &prepared, started.elapsed());
        tracing::debug!(phase = %RequestPhase::PostProcessed, domain = %prepared.domain, "Verdict normalized");

        let proof = ProofRecord::derive(&prepared.payload, &verdict, &prepared.rule_set_id);
        tracing::debug!(
            phase = %RequestPhase::Completed,
            domain = %prepared.domain,
            is_valid = verdict.is_valid,
            confidence = verdict.confidence,
            "Validation complete"
        );

        Ok(ValidationOutcome { verdict, proof })
    }

    /// Validate every request concurrently.
    ///
    /// Output order matches input order. A failure or panic in one item
    /// becomes that item's failed verdict, tagged with `requestIndex`.
    pub async fn batch_validate(&self, requests: Vec<ValidationRequest>) -> Vec<Verdict> {
        let started = Instant::now();
        let total = requests.len();

        let pipelines = requests.into_iter().enumerate().map(|(index, request)| {
            let original = request.clone();
            async move {
                let reason = match AssertUnwindSafe(self.validate(request)).catch_unwind().await {
                    Ok(Ok(outcome)) => return outcome.verdict,
                    Ok(Err(err)) => {
                        tracing::warn!(request_index = index, error = %err, "Batch item failed");
                        err.to_string()
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(request_index = index, panic = %message, "Batch item panicked");
                        format!("Validation panicked: {}", message)
                    }
                };

                recover(&original, reason, RequestPhase::Failed, started.elapsed())
                    .with_detail("requestIndex", json!(index))
            }
        });

        let verdicts = join_all(pipelines).await;
        tracing::debug!(
            total,
            valid = verdicts.iter().filter(|v| v.is_valid).count(),
            "Batch complete"
        );
        verdicts
    }

    /// Let the domain's agent decide, or explain why the heuristic stands.
    async fn assist(
        &self,
        prepared: &PreparedRequest,
        rule_set: &RuleSet,
        context: &ValidationContext,
        heuristic: Verdict,
    ) -> Verdict {
        let domain = prepared.domain;
        let Some(agent) = self.agents.get(domain) else {
            return heuristic;
        };

        // Input defects and sanctions hits are final.
        if heuristic.errors.is_some() || is_sanctions_match(&heuristic) {
            return heuristic;
        }

        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(&prepared.payload, context));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(assessment) = cache.get(key).await {
                tracing::debug!(domain = %domain, "AI assessment cache hit");
                return merge_assessment(domain, heuristic, assessment, agent.model());
            }
        }

        if let Admission::Skip { retry_in } = self.circuit_breaker.admit(domain) {
            tracing::warn!(domain = %domain, ?retry_in, "Circuit open, using heuristic verdict");
            return self.fall_back(domain, heuristic, &CapabilityError::CircuitOpen(domain).to_string());
        }

        let request = AgentRequest {
            payload: &prepared.payload,
            parameters: &rule_set.parameters,
            context,
            metadata: &prepared.metadata,
        };

        match agent.assess(request).await {
            Ok(assessment) => {
                self.circuit_breaker.record_success(domain);
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.insert(key, assessment.clone()).await;
                }
                merge_assessment(domain, heuristic, assessment, agent.model())
            }
            Err(err @ AgentError::InvalidPayload(_)) => {
                tracing::debug!(domain = %domain, error = %err, "Payload not assessable, using heuristic verdict");
                self.fall_back(domain, heuristic, &err.to_string())
            }
            Err(err) => {
                let reason = err.to_string();
                self.circuit_breaker.record_failure(domain, &reason);
                tracing::warn!(domain = %domain, error = %reason, "AI assessment failed, using heuristic verdict");
                self.fall_back(domain, heuristic, &reason)
            }
        }
    }

    /// Serve the heuristic verdict in place of an AI decision.
    fn fall_back(&self, domain: ValidationDomain, heuristic: Verdict, reason: &str) -> Verdict {
        self.circuit_breaker.record_fallback(domain);
        heuristic
            .with_detail("fallbackUsed", json!(true))
            .with_detail("fallbackReason", json!(reason))
    }

    pub fn list_rule_sets(&self, domain: Option<ValidationDomain>) -> Vec<RuleSet> {
        self.registry.list(domain)
    }

    pub fn get_rule_set(&self, id: &str) -> Result<RuleSet, EngineError> {
        self.registry
            .get(id)
            .ok_or_else(|| EngineError::RuleSetNotFound(id.to_string()))
    }

    pub fn create_rule_set(&self, config: RuleSetConfig) -> Result<RuleSet, EngineError> {
        Ok(self.registry.create(config)?)
    }

    pub fn update_rule_set(&self, id: &str, patch: RuleSetPatch) -> Result<RuleSet, EngineError> {
        self.registry
            .update(id, patch)?
            .ok_or_else(|| EngineError::RuleSetNotFound(id.to_string()))
    }

    /// Remove a rule set from future lookups. Past proofs stay verifiable.
    pub fn delete_rule_set(&self, id: &str) -> bool {
        self.registry.delete(id)
    }

    pub fn rule_set_parameters(&self, id: &str) -> Result<Parameters, EngineError> {
        self.registry
            .parameters(id)
            .ok_or_else(|| EngineError::RuleSetNotFound(id.to_string()))
    }

    /// Merge `parameters` into the rule set's existing map.
    pub fn update_rule_set_parameters(&self, id: &str, parameters: Parameters) -> Result<(), EngineError> {
        if self.registry.update_parameters(id, parameters)? {
            Ok(())
        } else {
            Err(EngineError::RuleSetNotFound(id.to_string()))
        }
    }

    pub fn available_domains(&self) -> Vec<ValidationDomain> {
        self.validators.domains()
    }

    pub fn capabilities(&self, domain: ValidationDomain) -> DomainCapabilities {
        let agent = self.agents.get(domain);
        DomainCapabilities {
            domain,
            default_rule_set_id: domain.default_rule_set_id(),
            capabilities: domain.capabilities().to_vec(),
            ai_assisted: agent.is_some(),
            ai_model: agent.map(|a| a.model().to_string()),
            circuit: self.circuit_breaker.health(domain),
        }
    }

    pub fn registry(&self) -> &Arc<RuleSetRegistry> {
        &self.registry
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("rule_sets", &self.registry.len())
            .field("validators", &self.validators)
            .field("agents", &self.agents)
            .field("cache", &self.cache)
            .finish()
    }
}

fn is_sanctions_match(verdict: &Verdict) -> bool {
    verdict.details.get(SANCTIONS_MATCH) == Some(&Value::Bool(true))
}

/// Scores at or above this count as a failed AI moderation check.
const AI_CHECK_CUTOFF: f64 = 0.7;

/// The AI decision replaces the heuristic one. Heuristic details stay
/// unless the AI reports the same key; flags are the union of both.
fn merge_assessment(
    domain: ValidationDomain,
    heuristic: Verdict,
    assessment: AiAssessment,
    model: &str,
) -> Verdict {
    let mut flags = heuristic.flags();
    for flag in &assessment.flags {
        if !flags.contains(flag) {
            flags.push(flag.clone());
        }
    }

    let mut ai_details = assessment.details;
    for key in ROUTING_KEYS {
        if ai_details.remove(key).is_some() {
            tracing::debug!(domain = %domain, key, "Dropped routing key from model details");
        }
    }

    let mut details = heuristic.details;
    details.extend(ai_details);
    details.insert(
        "heuristic".to_string(),
        json!({ "isValid": heuristic.is_valid, "confidence": heuristic.confidence }),
    );
    details.insert("reasoning".to_string(), json!(assessment.reasoning));
    details.insert("aiModel".to_string(), json!(model));
    if !flags.is_empty() {
        details.insert("flags".to_string(), json!(flags));
    }
    if domain == ValidationDomain::SocialContent {
        moderation_checks(&mut details);
    }

    let mut verdict = Verdict::new(assessment.is_valid, assessment.confidence, details);
    if !assessment.flags.is_empty() {
        verdict.errors = Some(assessment.flags);
    }
    verdict
}

/// Normalize the model's moderation scores and derive the check block.
fn moderation_checks(details: &mut Details) {
    let mut check = |key: &str| {
        let score = details.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        details.insert(key.to_string(), json!(score));
        if score < AI_CHECK_CUTOFF { "passed" } else { "failed" }
    };
    let checks = json!({
        "toxicityDetection": check("toxicityScore"),
        "spamDetection": check("spamScore"),
        "harassmentDetection": check("harassmentScore"),
        "aiAnalysis": "completed",
    });

    details.insert("checks".to_string(), checks);
    details
        .entry("contentCategory")
        .or_insert_with(|| json!("unknown"));
    details
        .entry("recommendedActions")
        .or_insert_with(|| json!([]));
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`ValidationEngine`].
pub struct ValidationEngineBuilder {
    registry: Option<Arc<RuleSetRegistry>>,
    validators: ValidatorSet,
    agents: AgentRegistry,
    circuit_breaker: CircuitBreakerConfig,
    cache: Option<CacheConfig>,
}

impl ValidationEngineBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            validators: ValidatorSet::standard(),
            agents: AgentRegistry::empty(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: None,
        }
    }

    /// Defaults to a registry seeded with the default rule sets.
    pub fn registry(mut self, registry: Arc<RuleSetRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    pub fn agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = agents;
        self
    }

    pub fn agent(mut self, agent: Arc<dyn ValidationAgent>) -> Self {
        self.agents = self.agents.with(agent);
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Cache AI assessments. Off unless set.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Fails when an agent is registered for a domain without a validator.
    pub fn build(self) -> Result<ValidationEngine, EngineError> {
        for domain in self.agents.domains() {
            self.validators.get(domain)?;
        }

        Ok(ValidationEngine {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(RuleSetRegistry::with_defaults())),
            validators: self.validators,
            agents: self.agents,
            circuit_breaker: CircuitBreaker::new(self.circuit_breaker),
            cache: self
                .cache
                .map(|config| AssessmentCache::new(config.max_entries, config.ttl)),
        })
    }
}

impl Default for ValidationEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ProviderError;
    use crate::resilience::CircuitState;
    use crate::testing::{capability, MockProvider};
    use attest_core::{Validator, ValidationDomain};
    use std::time::Duration;

    const CLEAN_WALLET: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
    const SANCTIONED_WALLET: &str = "0x1234567890123456789012345678901234567890";

    fn ai_engine(provider: Arc<MockProvider>) -> ValidationEngine {
        ValidationEngine::builder()
            .agents(AgentRegistry::standard(capability(provider)))
            .cache(CacheConfig::default())
            .build()
            .unwrap()
    }

    fn kyc(wallet: &str) -> ValidationRequest {
        ValidationRequest::with_default_rule_set(
            ValidationDomain::Compliance,
            json!({ "walletAddress": wallet }),
        )
    }

    fn social(content: &str) -> ValidationRequest {
        ValidationRequest::with_default_rule_set(ValidationDomain::SocialContent, json!({ "content": content }))
    }

    #[tokio::test]
    async fn test_heuristic_engine_validates() {
        let engine = ValidationEngine::heuristic();

        let outcome = engine.validate(kyc(CLEAN_WALLET)).await.unwrap();

        assert!(outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.confidence, 0.9);
        assert_eq!(outcome.verdict.details["ruleSetId"], "defi-kyc-v1");
        assert!(outcome.verdict.details.get("aiModel").is_none());
        assert!(outcome.proof.verify(&json!({ "walletAddress": CLEAN_WALLET }), true));
    }

    #[tokio::test]
    async fn test_ai_decision_replaces_heuristic() {
        let provider = MockProvider::replying(
            r#"{"isValid": false, "confidence": 0.75, "reasoning": "mixer exposure",
                "details": {"riskScore": 0.88, "ofacStatus": "clear", "amlFlags": ["mixer"],
                "geographicRisk": "medium"}, "flags": ["aml_mixer_exposure"]}"#,
        );
        let engine = ai_engine(provider.clone());

        let outcome = engine.validate(kyc(CLEAN_WALLET)).await.unwrap();
        let verdict = &outcome.verdict;

        assert!(!verdict.is_valid);
        assert_eq!(verdict.confidence, 0.75);
        assert_eq!(verdict.details["riskScore"], 0.88);
        assert_eq!(verdict.details["ofacStatus"], "clear");
        assert_eq!(verdict.details["reasoning"], "mixer exposure");
        assert_eq!(verdict.details["aiModel"], "gpt-4");
        assert_eq!(verdict.details["heuristic"]["isValid"], true);
        // Heuristic-only keys survive the merge
        assert!(verdict.details.contains_key("addressValidation"));
        assert_eq!(verdict.flags(), vec!["aml_mixer_exposure"]);
        assert_eq!(verdict.errors, Some(vec!["aml_mixer_exposure".to_string()]));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_cannot_override_routing_metadata() {
        let provider = MockProvider::replying(
            r#"{"isValid": true, "confidence": 0.9, "reasoning": "fine",
                "details": {"ruleSetId": "spoofed-v9", "domain": "social_content",
                "processingTimeMs": 999999, "heuristic": {"isValid": false},
                "riskScore": 0.1}}"#,
        );
        let engine = ai_engine(provider);

        let outcome = engine.validate(kyc(CLEAN_WALLET)).await.unwrap();
        let details = &outcome.verdict.details;

        assert_eq!(details["ruleSetId"], "defi-kyc-v1");
        assert_eq!(details["domain"], "compliance");
        assert_ne!(details["processingTimeMs"], 999999);
        assert_eq!(details["heuristic"]["isValid"], true);
        assert_eq!(details["riskScore"], 0.1);
        assert_eq!(outcome.proof.rule_set_id, "defi-kyc-v1");
    }

    #[tokio::test]
    async fn test_social_assessment_gets_moderation_checks() {
        let provider = MockProvider::replying(
            r#"{"isValid": false, "confidence": 0.8, "reasoning": "targeted insult",
                "details": {"toxicityScore": 0.4, "harassmentScore": 0.85}}"#,
        );
        let engine = ai_engine(provider);

        let outcome = engine.validate(social("ratio + you fell off")).await.unwrap();
        let details = &outcome.verdict.details;

        assert!(!outcome.verdict.is_valid);
        assert_eq!(details["checks"]["toxicityDetection"], "passed");
        assert_eq!(details["checks"]["harassmentDetection"], "failed");
        assert_eq!(details["checks"]["aiAnalysis"], "completed");
        assert_eq!(details["contentCategory"], "unknown");
        assert_eq!(details["recommendedActions"], json!([]));
        assert!(outcome.verdict.errors.is_none());
    }

    #[tokio::test]
    async fn test_sanctions_hit_is_final() {
        let provider = MockProvider::replying(r#"{"isValid": true, "confidence": 0.99}"#);
        let engine = ai_engine(provider.clone());

        let outcome = engine.validate(kyc(SANCTIONED_WALLET)).await.unwrap();

        assert!(!outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.confidence, 1.0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let provider = MockProvider::failing(ProviderError::Status {
            status: 503,
            message: "overloaded".to_string(),
        });
        let engine = ai_engine(provider);

        let outcome = engine.validate(social("HATE TOXIC ABUSE THREAT")).await.unwrap();
        let verdict = &outcome.verdict;

        assert!(!verdict.is_valid);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.details["fallbackUsed"], true);
        assert!(verdict.details["fallbackReason"]
            .as_str()
            .unwrap()
            .contains("overloaded"));
        assert_eq!(verdict.details["checks"]["toxicityDetection"], "failed");
    }

    #[tokio::test]
    async fn test_circuit_opens_after_repeated_failures() {
        let provider = MockProvider::failing(ProviderError::Transport("refused".to_string()));
        let engine = ValidationEngine::builder()
            .agents(AgentRegistry::standard(capability(provider.clone())))
            .circuit_breaker(CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_secs(60),
                success_threshold: 1,
            })
            .build()
            .unwrap();

        for _ in 0..2 {
            engine.validate(social("gm")).await.unwrap();
        }
        let health = engine.capabilities(ValidationDomain::SocialContent).circuit;
        assert_eq!(health.state, CircuitState::Open);
        assert_eq!(health.consecutive_failures, 2);
        assert!(health.last_failure.unwrap().contains("refused"));

        let outcome = engine.validate(social("gm")).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert!(outcome.verdict.details["fallbackReason"]
            .as_str()
            .unwrap()
            .contains("circuit open"));
        assert_eq!(engine.capabilities(ValidationDomain::SocialContent).circuit.fallbacks, 3);

        // Other domains are unaffected
        assert_eq!(
            engine.capabilities(ValidationDomain::Compliance).circuit,
            DomainHealth::default()
        );
    }

    #[tokio::test]
    async fn test_identical_payload_served_from_cache() {
        let provider = MockProvider::replying("Valid: true\nConfidence: 80");
        let engine = ai_engine(provider.clone());

        let first = engine.validate(social("gm frens")).await.unwrap();
        let second = engine.validate(social("gm frens")).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert!(second.verdict.is_valid);
        assert_eq!(first.verdict.confidence, 0.8);
        assert_eq!(second.verdict.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_input_defect_skips_ai() {
        let provider = MockProvider::replying(r#"{"isValid": true, "confidence": 1.0}"#);
        let engine = ai_engine(provider.clone());

        let request = ValidationRequest::with_default_rule_set(
            ValidationDomain::SocialContent,
            json!({ "author": "0xabc" }),
        );
        let outcome = engine.validate(request).await.unwrap();

        assert!(!outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.confidence, 0.0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_payload_recovered() {
        let engine = ValidationEngine::heuristic();
        let request = ValidationRequest {
            rule_set_id: Some("web3-social-v1".to_string()),
            domain: Some("social_content".to_string()),
            ..Default::default()
        };

        let outcome = engine.validate(request).await.unwrap();
        assert!(!outcome.verdict.is_valid);
        assert_eq!(outcome.verdict.details["failedAt"], "received");
    }

    #[tokio::test]
    async fn test_config_errors_surface() {
        let engine = ValidationEngine::heuristic();

        let mismatch = ValidationRequest::new(
            ValidationDomain::SocialContent,
            "defi-kyc-v1",
            json!({ "content": "gm" }),
        );
        let err = engine.validate(mismatch).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::DomainMismatch { .. })
        ));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_missing_validator_is_server_error() {
        let engine = ValidationEngine::builder()
            .validators(ValidatorSet::empty())
            .build()
            .unwrap();

        let err = engine.validate(social("gm")).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::NoValidator(_))));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_agent_without_validator_rejected_at_build() {
        let result = ValidationEngine::builder()
            .validators(ValidatorSet::empty())
            .agents(AgentRegistry::standard(capability(MockProvider::replying("{}"))))
            .build();
        assert!(result.is_err());
    }

    struct PanickingValidator;

    impl Validator for PanickingValidator {
        fn domain(&self) -> ValidationDomain {
            ValidationDomain::SensorTelemetry
        }

        fn validate(&self, _: &Value, _: &Parameters, _: &ValidationContext) -> Verdict {
            panic!("sensor firmware table missing")
        }
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_keeps_order() {
        let engine = ValidationEngine::builder()
            .validators(ValidatorSet::standard().with(Arc::new(PanickingValidator)))
            .build()
            .unwrap();

        let requests = vec![
            social("Shipping the governance module this week"),
            ValidationRequest::new(ValidationDomain::Compliance, "missing-v1", json!({ "walletAddress": CLEAN_WALLET })),
            ValidationRequest::with_default_rule_set(
                ValidationDomain::SensorTelemetry,
                json!({ "sensorId": "s-1", "readings": [1.0] }),
            ),
            kyc(SANCTIONED_WALLET),
        ];

        let verdicts = engine.batch_validate(requests).await;

        assert_eq!(verdicts.len(), 4);
        assert!(verdicts[0].is_valid);

        assert!(!verdicts[1].is_valid);
        assert_eq!(verdicts[1].confidence, 0.0);
        assert_eq!(verdicts[1].details["requestIndex"], 1);
        assert!(verdicts[1].errors.as_ref().unwrap()[0].contains("missing-v1"));

        assert_eq!(verdicts[2].details["requestIndex"], 2);
        assert!(verdicts[2].details["error"]
            .as_str()
            .unwrap()
            .contains("sensor firmware table missing"));

        assert_eq!(verdicts[3].confidence, 1.0);
        assert!(verdicts[3].details.get("requestIndex").is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        assert!(ValidationEngine::heuristic().batch_validate(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn test_rule_set_operations() {
        let engine = ValidationEngine::heuristic();

        assert_eq!(engine.list_rule_sets(None).len(), 4);
        assert_eq!(engine.list_rule_sets(Some(ValidationDomain::Compliance)).len(), 1);

        let created = engine
            .create_rule_set(
                RuleSetConfig::new("strict-social", "Strict Social", ValidationDomain::SocialContent)
                    .with_parameters(Parameters::new().with("toxicityThreshold", 0.1)),
            )
            .unwrap();
        assert_eq!(created.id, "strict-social");
        assert!(matches!(
            engine.create_rule_set(RuleSetConfig::new(
                "strict-social",
                "Again",
                ValidationDomain::SocialContent
            )),
            Err(EngineError::Registry(RegistryError::Conflict(_)))
        ));

        let strict = ValidationRequest::new(
            ValidationDomain::SocialContent,
            "strict-social",
            json!({ "content": "you are toxic" }),
        );
        assert!(!engine.validate(strict.clone()).await.unwrap().verdict.is_valid);

        engine
            .update_rule_set_parameters("strict-social", Parameters::new().with("toxicityThreshold", 0.9))
            .unwrap();
        assert_eq!(
            engine.rule_set_parameters("strict-social").unwrap().number("toxicityThreshold"),
            Some(0.9)
        );
        assert!(engine.validate(strict.clone()).await.unwrap().verdict.is_valid);

        assert!(matches!(
            engine.update_rule_set("nope", RuleSetPatch::default()),
            Err(EngineError::RuleSetNotFound(_))
        ));
        assert!(matches!(engine.get_rule_set("nope"), Err(EngineError::RuleSetNotFound(_))));

        assert!(engine.delete_rule_set("strict-social"));
        assert!(!engine.delete_rule_set("strict-social"));
        assert!(matches!(
            engine.validate(strict).await,
            Err(EngineError::Validation(ValidationError::UnknownRuleSet(_)))
        ));
    }

    #[test]
    fn test_capabilities() {
        let engine = ai_engine(MockProvider::replying("{}"));
        assert_eq!(engine.available_domains(), ValidationDomain::ALL.to_vec());

        let caps = engine.capabilities(ValidationDomain::Compliance);
        assert!(caps.ai_assisted);
        assert_eq!(caps.ai_model.as_deref(), Some("gpt-4"));
        assert!(caps.capabilities.contains(&"OFAC sanctions screening"));

        let heuristic = ValidationEngine::heuristic().capabilities(ValidationDomain::Compliance);
        assert!(!heuristic.ai_assisted);
        assert_eq!(heuristic.circuit.state, CircuitState::Closed);
        assert_eq!(heuristic.circuit.fallbacks, 0);
    }

    #[test]
    fn test_from_config_without_provider_is_heuristic() {
        let config = RuntimeConfig::from_yaml("sanctions: [\"0xabc0000000000000000000000000000000000000\"]").unwrap();
        let engine = ValidationEngine::from_config(&config).unwrap();

        assert!(!engine.capabilities(ValidationDomain::SocialContent).ai_assisted);
        assert_eq!(engine.list_rule_sets(None).len(), 4);
    }

    #[test]
    fn test_from_config_unknown_provider_fails() {
        let config = RuntimeConfig::from_yaml("capability:\n  provider:\n    type: nope\n").unwrap();
        assert!(matches!(
            ValidationEngine::from_config(&config),
            Err(ConfigError::Provider(ProviderError::UnknownType(_)))
        ));
    }
}
