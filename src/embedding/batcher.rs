use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Splits texts into batches and embeds a bounded number of them concurrently
///
/// Vectors come back in input order no matter which batch finishes first.
#[derive(Clone)]
pub struct EmbeddingBatcher {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    max_concurrent: usize,
}

impl EmbeddingBatcher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, max_concurrent: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self::new(provider, config.batch_size, config.max_concurrent_batches)
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed every text; `result[i]` is the vector of `texts[i]`
    pub async fn embed_many(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let total = texts.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut batches = Vec::with_capacity(total.div_ceil(self.batch_size));
        let mut remaining = texts.into_iter();
        let mut offset = 0;
        loop {
            let batch: Vec<String> = remaining.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let len = batch.len();
            batches.push((offset, batch));
            offset += len;
        }

        tracing::debug!(
            "Embedding {} texts in {} batches ({} concurrent)",
            total,
            batches.len(),
            self.max_concurrent
        );

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; total];
        let mut results = stream::iter(
            batches
                .into_iter()
                .map(|(offset, batch)| embed_at(Arc::clone(&self.provider), offset, batch)),
        )
        .buffer_unordered(self.max_concurrent);

        while let Some(result) = results.next().await {
            let (offset, vectors) = result?;
            for (i, vector) in vectors.into_iter().enumerate() {
                slots[offset + i] = Some(vector);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    EmbeddingError::GenerationFailed(format!("no vector produced for text {}", i))
                        .into()
                })
            })
            .collect()
    }

    /// Embed a single query text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationFailed("empty result".to_string()).into())
    }
}

/// Embed one batch on the blocking pool, returning it with its starting offset
async fn embed_at(
    provider: Arc<dyn EmbeddingProvider>,
    offset: usize,
    batch: Vec<String>,
) -> Result<(usize, Vec<Vec<f32>>)> {
    let expected = batch.len();
    let vectors = tokio::task::spawn_blocking(move || provider.embed_batch(batch))
        .await
        .map_err(|e| EmbeddingError::GenerationFailed(format!("embedding task failed: {}", e)))?
        .with_context(|| format!("Failed to embed batch at offset {}", offset))?;

    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        }
        .into());
    }

    Ok((offset, vectors))
}
