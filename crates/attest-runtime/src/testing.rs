//! Test doubles shared by the runtime's unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::capability::AiCapability;
use crate::completion::{CompletionBackend, ProviderError, Sampling};
use crate::config::CapabilityConfig;

/// Answers every completion with the same reply and records prompts.
pub(crate) struct MockProvider {
    reply: Result<String, ProviderError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub(crate) fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl CompletionBackend for MockProvider {
    async fn complete(&self, _system: &str, user: &str, _sampling: &Sampling) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(user.to_string());
        self.reply.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Capability over `provider` with no retries.
pub(crate) fn capability(provider: Arc<MockProvider>) -> Arc<AiCapability> {
    let config = CapabilityConfig {
        retries: 0,
        ..Default::default()
    };
    Arc::new(AiCapability::new(provider, &config))
}
