/// Error types for shared infrastructure.
///
/// Redis failures never surface here: `RedisCache` reports them as cache misses.
/// Chat backend failures are reported as `OpenAiClientError`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("embedding error: {0}")]
    Embedding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_error_names_its_cause() {
        let err = CommonError::Embedding("model initialization failed: offline".to_string());
        assert_eq!(err.to_string(), "embedding error: model initialization failed: offline");
    }
}
