//! Completion backends for the AI capability.
//!
//! A backend answers one exchange (a system prompt plus a user prompt) with
//! text. Which backend runs is decided by `capability.provider.type` in the
//! runtime config; the OpenAI-compatible client is compiled in with the
//! `openai` feature.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderConfig;

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAiClient;

/// Failures talking to a completion backend.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("provider throttled the request (retry after {retry_after:?})")]
    Throttled { retry_after: Option<Duration> },

    #[error("provider answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unreadable provider reply: {0}")]
    Malformed(String),

    #[error("provider rejected the API key")]
    Unauthorized,

    #[error("unsupported provider type '{0}'")]
    UnknownType(String),

    #[error("provider misconfigured: {0}")]
    Misconfigured(String),
}

impl ProviderError {
    /// Whether the capability should try the same exchange again.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Throttled { .. } => true,
            ProviderError::Status { status, .. } => *status == 408 || *status >= 500,
            _ => false,
        }
    }
}

/// Sampling for one exchange. Agents start from the capability's defaults
/// and adjust per domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampling {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Bound on a single attempt, retries excluded.
    pub timeout: Duration,
}

/// Something that turns prompts into text.
///
/// Only [`crate::capability::AiCapability`] calls this. It owns timeouts and
/// retries, so implementations make exactly one attempt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str, sampling: &Sampling) -> Result<String, ProviderError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Build the backend named by `config.provider_type`.
pub fn connect(config: &ProviderConfig) -> Result<Arc<dyn CompletionBackend>, ProviderError> {
    match config.provider_type.as_str() {
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(OpenAiClient::from_settings(&config.settings)?)),
        other => Err(ProviderError::UnknownType(other.to_string())),
    }
}
