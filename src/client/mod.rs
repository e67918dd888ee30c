//! Library client for repo-rag
//!
//! A [`RagClient`] is bound to one indexed root. It owns the vector index
//! handle for that root, the manifest location and the embedding pipeline;
//! nothing is shared through process-wide state.

use crate::config::Config;
use crate::embedding::{EmbeddingBatcher, EmbeddingProvider, provider_from_model_name};
use crate::error::IndexingError;
use crate::indexer::{CodeChunker, classify};
use crate::manifest::TrainManifest;
use crate::paths::PlatformPaths;
use crate::retriever::{Retriever, group_by_file};
use crate::types::*;
use crate::vector_db::{LanceVectorIndex, VectorIndex};

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Main client for training and querying one source tree
///
/// # Example
///
/// ```no_run
/// use repo_rag::{Config, PartitionMode, RagClient};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = RagClient::open(Config::new()?, "/path/to/code").await?;
///
///     let response = client.train(false).await?;
///     println!("Processed {} files", response.files_processed);
///
///     let contexts = client.retrieve("where are sessions refreshed", 8, PartitionMode::Both).await?;
///     for context in contexts.contexts {
///         println!("{} ({:.2})", context.metadata.origin(), context.score);
///     }
///
///     client.close().await
/// }
/// ```
pub struct RagClient {
    pub(crate) config: Config,
    pub(crate) root: PathBuf,
    pub(crate) manifest_path: PathBuf,
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) batcher: EmbeddingBatcher,
    pub(crate) chunker: CodeChunker,
    retriever: Retriever,
}

impl RagClient {
    /// Open the LanceDB store for `root` under the configured data directory
    pub async fn open(config: Config, root: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;
        let root = canonical_root(root.as_ref())?;

        tracing::info!("Opening index for {}", root.display());
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let provider = provider_from_model_name(&config.embedding.model_name)
            .context("Failed to initialize embedding provider")?;

        let data_dir = &config.storage.data_dir;
        let lancedb_path = PlatformPaths::lancedb_path(data_dir, &root);
        let index = LanceVectorIndex::open(&lancedb_path)
            .await
            .context("Failed to open LanceDB vector index")?;
        let manifest_path = PlatformPaths::manifest_path(data_dir, &root);

        Self::with_components(config, root, provider, Arc::new(index), manifest_path)
    }

    /// Assemble a client from explicit parts (custom index or provider)
    pub fn with_components(
        config: Config,
        root: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        manifest_path: PathBuf,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = CodeChunker::new(config.chunking.to_chunk_config())?;
        let batcher = EmbeddingBatcher::from_config(provider, &config.embedding);
        let retriever = Retriever::new(Arc::clone(&index));

        Ok(Self {
            config,
            root: root.into(),
            manifest_path,
            index,
            batcher,
            chunker,
            retriever,
        })
    }

    /// Index the root, re-embedding only new or modified files
    ///
    /// With `full` the manifest and every indexed item are discarded first.
    pub async fn train(&self, full: bool) -> Result<TrainResponse> {
        indexing::do_train(self, full).await
    }

    /// Split the markdown/text documents under `path` into sections and index them
    pub async fn ingest_knowledge(&self, path: impl AsRef<Path>) -> Result<KnowledgeResponse> {
        indexing::do_ingest_knowledge(self, path.as_ref()).await
    }

    /// Embed `query` and return file-grouped context
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        mode: PartitionMode,
    ) -> Result<QueryResponse> {
        self.query(QueryRequest {
            query: query.to_string(),
            top_k,
            mode,
        })
        .await
    }

    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        request.validate()?;
        let start = Instant::now();

        self.ensure_initialized().await?;

        let query_vector = self
            .batcher
            .embed(&request.query)
            .await
            .context("Failed to generate query embedding")?;

        let contexts = self
            .retriever
            .retrieve(&query_vector, request.top_k, request.mode)
            .await
            .context("Failed to query vector index")?;

        Ok(QueryResponse {
            contexts: group_by_file(contexts),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Manifest and index statistics for this root
    pub async fn statistics(&self) -> Result<StatisticsResponse> {
        let manifest = TrainManifest::load(&self.manifest_path);

        let mut by_language: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        if let Some(manifest) = &manifest {
            for (path, entry) in &manifest.files {
                let language = classify(Path::new(path)).to_string();
                let counts = by_language.entry(language).or_default();
                counts.0 += 1;
                counts.1 += entry.chunk_count;
            }
        }

        let language_breakdown = by_language
            .into_iter()
            .map(|(language, (file_count, chunk_count))| LanguageStats {
                language,
                file_count,
                chunk_count,
            })
            .collect();

        let index_items = self
            .index
            .count()
            .await
            .context("Failed to count index items")?;

        Ok(StatisticsResponse {
            total_files: manifest.as_ref().map_or(0, |m| m.files.len()),
            total_chunks: manifest.as_ref().map_or(0, |m| m.total_chunks()),
            index_items,
            trained_at: manifest.map(|m| m.trained_at),
            language_breakdown,
        })
    }

    /// Remove every indexed item and the manifest
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await.context("Failed to clear index")?;
        TrainManifest::remove(&self.manifest_path)?;
        tracing::info!("Cleared index for {}", self.root.display());
        Ok(())
    }

    /// Release the index handle, dropping any update left open
    pub async fn close(self) -> Result<()> {
        self.index.cancel_update().await?;
        tracing::debug!("Closed index for {}", self.root.display());
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedding_dimension(&self) -> usize {
        self.batcher.dimension()
    }

    /// Create the index storage for the provider's dimension if it is missing
    pub(crate) async fn ensure_initialized(&self) -> Result<()> {
        self.index
            .initialize(self.batcher.dimension())
            .await
            .context("Failed to initialize vector index")
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(IndexingError::InvalidPath(format!("{} does not exist", root.display())).into());
    }
    root.canonicalize()
        .map_err(|e| IndexingError::InvalidPath(format!("{}: {}", root.display(), e)).into())
}

// Training and knowledge ingestion
pub(crate) mod indexing;

#[cfg(test)]
mod tests;
