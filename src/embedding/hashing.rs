use super::EmbeddingProvider;
use anyhow::Result;
use sha2::{Digest, Sha256};

pub(crate) const MODEL_PREFIX: &str = "hashing";
pub(crate) const DEFAULT_DIMENSION: usize = 256;

/// Deterministic bag-of-tokens embedder
///
/// Each lowercase alphanumeric token is hashed into one of `dimension` signed
/// buckets and the result is normalized to unit length. Texts sharing tokens
/// land close together, which is enough for offline runs and tests; it has no
/// notion of meaning.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_name: format!("{}-{}", MODEL_PREFIX, dimension),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let hash = token_hash(&token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        } else {
            vector[0] = 1.0;
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

/// First eight bytes of the token's SHA-256 digest, big-endian
fn token_hash(token: &str) -> u64 {
    Sha256::digest(token.as_bytes())[..8]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
