use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use anyhow::Result;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Local FastEmbed model; one inference at a time behind a mutex
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

/// Names accepted in `embedding.model_name`, with their output dimension
const KNOWN_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("BAAI/bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("BAAI/bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize, &'static str)> {
    let short = name.rsplit('/').next().unwrap_or(name);
    KNOWN_MODELS
        .iter()
        .find(|(known, _, _)| {
            known.eq_ignore_ascii_case(name)
                || known
                    .rsplit('/')
                    .next()
                    .is_some_and(|k| k.eq_ignore_ascii_case(short))
        })
        .map(|(known, model, dimension)| (model.clone(), *dimension, *known))
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager from a configured model name
    pub fn from_model_name(name: &str) -> Result<Self> {
        let (model, dimension, canonical) =
            resolve_model(name).ok_or_else(|| EmbeddingError::UnknownModel(name.to_string()))?;

        tracing::info!("Initializing FastEmbed model: {}", canonical);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = false;

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name: canonical.to_string(),
        })
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        let embeddings = model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
