//! Client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! ```yaml
//! capability:
//!   provider:
//!     type: openai
//!     settings:
//!       base_url: https://gateway.internal/v1   # optional
//!       api_key_env: GATEWAY_KEY                # optional, default OPENAI_API_KEY
//! ```
//!
//! An inline `api_key` setting wins over the environment. The key is held as
//! a [`SecretString`] and never appears in `Debug` output or logs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{CompletionBackend, ProviderError, Sampling};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    #[serde(default)]
    api_key: Option<String>,

    #[serde(default = "default_key_env")]
    api_key_env: String,

    #[serde(default = "default_base_url")]
    base_url: String,
}

fn default_key_env() -> String {
    DEFAULT_KEY_ENV.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl OpenAiClient {
    /// Resolve provider settings into a client. Fails when no key is found
    /// or `base_url` is not an http(s) URL.
    pub fn from_settings(settings: &JsonValue) -> Result<Self, ProviderError> {
        let settings: Settings = serde_json::from_value(settings.clone())
            .map_err(|e| ProviderError::Misconfigured(format!("openai settings: {e}")))?;

        let base_url = settings.base_url.trim().trim_end_matches('/');
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(ProviderError::Misconfigured(format!(
                "base_url must be an http(s) URL, got '{base_url}'"
            )));
        }

        let api_key = settings
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(&settings.api_key_env).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Misconfigured(format!(
                    "no API key: set settings.api_key or {}",
                    settings.api_key_env
                ))
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: format!("{base_url}/chat/completions"),
            api_key: SecretString::from(api_key),
        })
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> WireRequest<'a> {
    fn new(system: &'a str, user: &'a str, sampling: &'a Sampling) -> Self {
        Self {
            model: &sampling.model,
            messages: [
                WireMessage { role: "system", content: system },
                WireMessage { role: "user", content: user },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        }
    }
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    total_tokens: u32,
}

#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, system: &str, user: &str, sampling: &Sampling) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(sampling.timeout)
            .json(&WireRequest::new(system, user, sampling))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            401 | 403 => return Err(ProviderError::Unauthorized),
            429 => {
                return Err(ProviderError::Throttled {
                    retry_after: retry_after(response.headers()),
                })
            }
            code => {
                let message = response
                    .json::<WireErrorEnvelope>()
                    .await
                    .map(|envelope| envelope.error.message)
                    .unwrap_or_else(|_| status.to_string());
                return Err(ProviderError::Status { status: code, message });
            }
        }

        let reply: WireReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if let Some(usage) = &reply.usage {
            tracing::debug!(model = %sampling.model, tokens = usage.total_tokens, "Completion received");
        }

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::Malformed("reply has no choices".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
