/// Centralized error types for repo-rag using thiserror
///
/// Internal plumbing passes these around inside `anyhow::Error`; converting back
/// into [`RagError`] recovers the typed variant so callers can tell user-input
/// problems from an unreachable embedding model or vector index.
use thiserror::Error;

/// Main error type for the RAG system
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector index error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding provider returned {actual} vectors for a batch of {expected} texts")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),
}

/// Errors related to vector index operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to connect to vector index: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create table '{table}': {reason}")]
    TableCreationFailed { table: String, reason: String },

    #[error("Failed to store items: {0}")]
    StoreFailed(String),

    #[error("Failed to query index: {0}")]
    QueryFailed(String),

    #[error("Failed to delete items: {0}")]
    DeleteFailed(String),

    #[error("Insert outside of an update transaction")]
    NoActiveUpdate,

    #[error("An update transaction is already in progress")]
    UpdateInProgress,

    #[error("Index integrity error: {0}")]
    Integrity(String),

    #[error("Index is not initialized")]
    NotInitialized,
}

/// Errors related to source discovery
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No source files found under {0}")]
    NoSourceFilesFound(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),

    #[error("Failed to read file '{file}': {reason}")]
    FileReadFailed { file: String, reason: String },
}

/// Errors related to code chunking
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Invalid chunk parameters: {0}")]
    InvalidParameters(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Empty {0}")]
    Empty(String),
}

/// Errors related to the train manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to save manifest to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Failed to remove manifest '{path}': {reason}")]
    RemoveFailed { path: String, reason: String },
}

// Recover the typed error carried inside an anyhow chain, if any
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<RagError>() {
            Ok(e) => return e,
            Err(err) => err,
        };
        let err = match err.downcast::<IndexingError>() {
            Ok(e) => return RagError::Indexing(e),
            Err(err) => err,
        };
        let err = match err.downcast::<EmbeddingError>() {
            Ok(e) => return RagError::Embedding(e),
            Err(err) => err,
        };
        let err = match err.downcast::<VectorDbError>() {
            Ok(e) => return RagError::VectorDb(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return RagError::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ValidationError>() {
            Ok(e) => return RagError::Validation(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ChunkingError>() {
            Ok(e) => return RagError::Chunking(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ManifestError>() {
            Ok(e) => return RagError::Manifest(e),
            Err(err) => err,
        };
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Check if this is a user error (bad path, unsupported input, bad config)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_)
                | RagError::Config(ConfigError::InvalidValue { .. })
                | RagError::Indexing(
                    IndexingError::InvalidPath(_)
                        | IndexingError::UnsupportedFileType(_)
                        | IndexingError::NoSourceFilesFound(_)
                )
        )
    }

    /// Check if the embedding model or the vector index could not be reached
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            self,
            RagError::VectorDb(VectorDbError::ConnectionFailed(_))
                | RagError::Embedding(
                    EmbeddingError::InitializationFailed(_) | EmbeddingError::GenerationFailed(_)
                )
        )
    }
}
