/// Configuration system for repo-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use crate::indexer::ChunkConfig;
use crate::types::PartitionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where manifests and indexes are stored
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunk sizing
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Retrieval defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory; each indexed root gets its own store below it
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Number of texts per embedding batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of batches in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

/// Chunk sizing, in lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,

    #[serde(default = "default_target_lines")]
    pub target_lines: usize,

    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    #[serde(default = "default_overlap_lines")]
    pub overlap_lines: usize,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Number of items written per index update transaction
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of contexts returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Default partition mode
    #[serde(default)]
    pub mode: PartitionMode,
}

fn default_data_dir() -> PathBuf {
    crate::paths::PlatformPaths::project_data_dir()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent_batches() -> usize {
    3
}

fn default_min_lines() -> usize {
    5
}

fn default_target_lines() -> usize {
    40
}

fn default_max_lines() -> usize {
    80
}

fn default_overlap_lines() -> usize {
    5
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_write_batch_size() -> usize {
    256
}

fn default_top_k() -> usize {
    8
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_lines: default_min_lines(),
            target_lines: default_target_lines(),
            max_lines: default_max_lines(),
            overlap_lines: default_overlap_lines(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            write_batch_size: default_write_batch_size(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            mode: PartitionMode::default(),
        }
    }
}

impl ChunkingConfig {
    pub fn to_chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            min_lines: self.min_lines,
            target_lines: self.target_lines,
            max_lines: self.max_lines,
            overlap_lines: self.overlap_lines,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.embedding.max_concurrent_batches == 0 {
            return Err(invalid(
                "embedding.max_concurrent_batches",
                "must be greater than 0",
            ));
        }

        let chunking = &self.chunking;
        if chunking.min_lines == 0 {
            return Err(invalid("chunking.min_lines", "must be greater than 0"));
        }
        if chunking.target_lines < chunking.min_lines {
            return Err(invalid(
                "chunking.target_lines",
                format!(
                    "must be at least min_lines ({}), got {}",
                    chunking.min_lines, chunking.target_lines
                ),
            ));
        }
        if chunking.max_lines < chunking.target_lines {
            return Err(invalid(
                "chunking.max_lines",
                format!(
                    "must be at least target_lines ({}), got {}",
                    chunking.target_lines, chunking.max_lines
                ),
            ));
        }
        if chunking.overlap_lines >= chunking.target_lines {
            return Err(invalid(
                "chunking.overlap_lines",
                format!(
                    "must be smaller than target_lines ({}), got {}",
                    chunking.target_lines, chunking.overlap_lines
                ),
            ));
        }

        if self.indexing.max_file_size == 0 {
            return Err(invalid("indexing.max_file_size", "must be greater than 0"));
        }

        if self.indexing.write_batch_size == 0 {
            return Err(invalid("indexing.write_batch_size", "must be greater than 0"));
        }

        if self.retrieval.top_k == 0 {
            return Err(invalid("retrieval.top_k", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("REPO_RAG_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(model) = std::env::var("REPO_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(batch_size) = std::env::var("REPO_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Ok(top_k) = std::env::var("REPO_RAG_TOP_K")
            && let Ok(k) = top_k.parse()
        {
            self.retrieval.top_k = k;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
