//! The AI capability adapter.
//!
//! Wraps a [`CompletionBackend`] behind a two-call contract: `complete` turns a
//! prompt into text, `parse_structured` turns text into an [`AiAssessment`].
//! Each attempt is bounded by the configured timeout, and transient failures
//! are retried with exponential backoff.

use attest_core::ValidationDomain;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::assessment::{parse_structured, AiAssessment};
use crate::config::CapabilityConfig;
use crate::completion::{CompletionBackend, ProviderError, Sampling};

/// Recoverable failures of the AI path. The engine answers all of them with
/// the heuristic verdict.
#[derive(Error, Debug, Clone)]
pub enum CapabilityError {
    #[error("AI capability timed out after {0:?}")]
    Timeout(Duration),

    #[error("AI circuit open for domain {0}")]
    CircuitOpen(ValidationDomain),

    #[error("AI provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl CapabilityError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CapabilityError::Timeout(_) => true,
            CapabilityError::Provider(err) => err.is_transient(),
            CapabilityError::CircuitOpen(_) => false,
        }
    }
}

/// A text-completion capability with timeout and retry.
pub struct AiCapability {
    backend: Arc<dyn CompletionBackend>,
    sampling: Sampling,
    retries: usize,
    retry_delay: Duration,
}

impl AiCapability {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &CapabilityConfig) -> Self {
        Self {
            backend,
            sampling: config.sampling(),
            retries: config.retries,
            retry_delay: config.retry_delay,
        }
    }

    /// Default sampling; agents adjust it per domain.
    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run one completion.
    pub async fn complete(
        &self,
        prompt: &str,
        system: &str,
        sampling: &Sampling,
    ) -> Result<String, CapabilityError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry_delay)
            .with_max_times(self.retries);

        let text = (|| self.attempt(prompt, system, sampling))
            .retry(backoff)
            .when(CapabilityError::is_transient)
            .notify(|err: &CapabilityError, delay: Duration| {
                tracing::debug!(
                    backend = self.backend.name(),
                    error = %err,
                    delay = ?delay,
                    "Retrying AI completion"
                );
            })
            .await?;

        tracing::debug!(
            backend = self.backend.name(),
            model = %sampling.model,
            chars = text.len(),
            "AI completion finished"
        );
        Ok(text)
    }

    /// Run one completion and parse the reply.
    pub async fn assess(
        &self,
        prompt: &str,
        system: &str,
        sampling: &Sampling,
    ) -> Result<AiAssessment, CapabilityError> {
        let text = self.complete(prompt, system, sampling).await?;
        Ok(self.parse_structured(&text))
    }

    pub fn parse_structured(&self, text: &str) -> AiAssessment {
        parse_structured(text)
    }

    async fn attempt(
        &self,
        prompt: &str,
        system: &str,
        sampling: &Sampling,
    ) -> Result<String, CapabilityError> {
        match tokio::time::timeout(sampling.timeout, self.backend.complete(system, prompt, sampling)).await {
            Ok(result) => result.map_err(CapabilityError::from),
            Err(_) => Err(CapabilityError::Timeout(sampling.timeout)),
        }
    }
}

impl std::fmt::Debug for AiCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiCapability")
            .field("backend", &self.backend.name())
            .field("sampling", &self.sampling)
            .field("retries", &self.retries)
            .finish()
    }
}
