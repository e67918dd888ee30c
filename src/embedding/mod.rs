//! Embedding providers and the batch coordinator that drives them

mod batcher;
mod fastembed_manager;
mod hashing;

pub use batcher::EmbeddingBatcher;
pub use fastembed_manager::FastEmbedManager;
pub use hashing::HashingEmbedder;

use anyhow::Result;
use std::sync::Arc;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text, one vector per text, in order
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the provider named in `embedding.model_name`
///
/// `hashing` (optionally `hashing-<dimension>`) selects the offline
/// [`HashingEmbedder`]; anything else is resolved as a FastEmbed model.
pub fn provider_from_model_name(name: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    if let Some(rest) = name.strip_prefix(hashing::MODEL_PREFIX) {
        let dimension = match rest.strip_prefix('-') {
            Some(dim) => dim
                .parse()
                .map_err(|_| crate::error::EmbeddingError::UnknownModel(name.to_string()))?,
            None if rest.is_empty() => hashing::DEFAULT_DIMENSION,
            None => return Err(crate::error::EmbeddingError::UnknownModel(name.to_string()).into()),
        };
        return Ok(Arc::new(HashingEmbedder::new(dimension)));
    }

    Ok(Arc::new(FastEmbedManager::from_model_name(name)?))
}
