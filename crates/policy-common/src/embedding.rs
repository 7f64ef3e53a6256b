/// Embedding wrapper around fastembed.
///
/// `TextEmbedding` is synchronous and CPU-bound, so every embed call goes through
/// `tokio::task::spawn_blocking`. The model is loaded once at process start and shared
/// read-only behind an `Arc`.
///
/// nomic-embed-text-v1.5 expects task-prefixed inputs. Section alignment is a symmetric
/// comparison, so both sides use the `clustering: ` prefix.
use std::sync::Arc;

use crate::error::CommonError;

pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
}

impl Embedder {
    /// Initialize the embedding model (nomic-embed-text-v1.5).
    ///
    /// This downloads the model on first run (~300MB).
    pub async fn new() -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(|| {
            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::NomicEmbedTextV15)
                .with_show_download_progress(false);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    /// Embed section texts for pairwise comparison.
    ///
    /// Texts are processed in small batches to bound peak memory during ONNX inference.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let prefixed: Vec<String> = texts.iter().map(|t| format!("clustering: {t}")).collect();
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(prefixed, Some(4)))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("text embedding failed: {e}")))
    }

    /// Returns the dimensionality of the embedding vectors (768 for nomic-embed-text-v1.5).
    pub fn dimensions(&self) -> usize {
        768
    }
}
