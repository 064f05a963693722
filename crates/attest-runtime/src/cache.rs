//! Cache of AI assessments.
//!
//! Identical payloads validated under an unchanged rule set reuse the
//! previous assessment instead of calling the capability again. Any rule-set
//! edit bumps `updatedAt`, which changes the key.

use attest_core::{data_hash, ValidationContext, ValidationDomain};
use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

use crate::assessment::AiAssessment;

/// Cache key for one AI assessment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    domain: ValidationDomain,
    data_hash: String,
    rule_set_id: String,
    rule_set_version: i64,
}

impl CacheKey {
    pub fn new(payload: &Value, context: &ValidationContext) -> Self {
        Self {
            domain: context.domain,
            data_hash: data_hash(payload),
            rule_set_id: context.rule_set_id.clone(),
            rule_set_version: context.rule_set_updated_at.timestamp_millis(),
        }
    }
}

/// Assessment cache using moka.
pub struct AssessmentCache {
    cache: Cache<CacheKey, AiAssessment>,
}

impl AssessmentCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<AiAssessment> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, assessment: AiAssessment) {
        self.cache.insert(key, assessment).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for AssessmentCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

impl std::fmt::Debug for AssessmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
