/// Redis cache for primary analysis results.
///
/// All operations degrade to a miss when Redis is unavailable; the analyzer then calls
/// the upstream model as usual.
///
/// Key schema:
/// - `pdiff:v1:analysis:{sha256(model, change, title, text_a, text_b)}`: JSON-serialized
///   `SectionAnalysis` (TTL configurable, default 86400s)
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::analysis::ChangeRequest;
use crate::model::SectionAnalysis;
use policy_common::redis::RedisCache;

const KEY_PREFIX: &str = "pdiff:v1:";
pub const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Clone)]
pub struct AnalysisCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl AnalysisCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get_analysis(&self, model: &str, request: &ChangeRequest) -> Option<SectionAnalysis> {
        let key = analysis_key(model, request);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_analysis(&self, model: &str, request: &ChangeRequest, analysis: &SectionAnalysis) {
        let key = analysis_key(model, request);
        if let Ok(json) = serde_json::to_string(analysis) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }
}

/// Deterministic key over everything that influences the model's answer. Fields are
/// length-prefixed so adjacent values cannot run together.
fn analysis_key(model: &str, request: &ChangeRequest) -> String {
    let mut hasher = Sha256::new();
    for part in [
        Some(model),
        Some(request.change_type.as_str()),
        Some(request.title.as_str()),
        request.text_a.as_deref(),
        request.text_b.as_deref(),
    ] {
        match part {
            Some(value) => {
                hasher.update(value.len().to_string().as_bytes());
                hasher.update(b":");
                hasher.update(value.as_bytes());
            }
            None => hasher.update(b"-"),
        }
        hasher.update(b"|");
    }
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}analysis:{:x}", hash)
}
