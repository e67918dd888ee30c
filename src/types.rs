use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical subdivision of the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Code,
    Knowledge,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Code => "code",
            Partition::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which partitions a retrieval consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionMode {
    #[default]
    Code,
    Knowledge,
    Both,
}

impl FromStr for PartitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(PartitionMode::Code),
            "knowledge" => Ok(PartitionMode::Knowledge),
            "both" => Ok(PartitionMode::Both),
            other => Err(format!(
                "unknown partition mode '{}', expected code, knowledge or both",
                other
            )),
        }
    }
}

/// Kind of code a chunk starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Imports,
    Class,
    Function,
    Block,
    General,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Imports => "imports",
            ChunkKind::Class => "class",
            ChunkKind::Function => "function",
            ChunkKind::Block => "block",
            ChunkKind::General => "general",
        }
    }
}

impl FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imports" => Ok(ChunkKind::Imports),
            "class" => Ok(ChunkKind::Class),
            "function" => Ok(ChunkKind::Function),
            "block" => Ok(ChunkKind::Block),
            "general" => Ok(ChunkKind::General),
            other => Err(format!("unknown chunk kind '{}'", other)),
        }
    }
}

/// Metadata stored with each code chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetadata {
    pub text: String,
    /// Absolute path of the source file
    pub file_path: String,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_kind: ChunkKind,
}

/// Metadata stored with each knowledge-document section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeMetadata {
    pub text: String,
    /// Document the section came from
    pub source: String,
    /// Heading of the section
    pub section: String,
}

/// Denormalized item metadata as written into the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemMetadata {
    Code(CodeMetadata),
    Knowledge(KnowledgeMetadata),
}

impl ItemMetadata {
    pub fn partition(&self) -> Partition {
        match self {
            ItemMetadata::Code(_) => Partition::Code,
            ItemMetadata::Knowledge(_) => Partition::Knowledge,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ItemMetadata::Code(m) => &m.text,
            ItemMetadata::Knowledge(m) => &m.text,
        }
    }

    /// File path for code items, source document for knowledge items
    pub fn origin(&self) -> &str {
        match self {
            ItemMetadata::Code(m) => &m.file_path,
            ItemMetadata::Knowledge(m) => &m.source,
        }
    }

    pub fn start_line(&self) -> Option<usize> {
        match self {
            ItemMetadata::Code(m) => Some(m.start_line),
            ItemMetadata::Knowledge(_) => None,
        }
    }
}

/// A single hit returned by the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub metadata: ItemMetadata,
    pub score: f32,
}

/// A context snippet handed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub text: String,
    pub metadata: ItemMetadata,
    pub score: f32,
}

impl From<ScoredItem> for RetrievedContext {
    fn from(item: ScoredItem) -> Self {
        Self {
            text: item.metadata.text().to_string(),
            metadata: item.metadata,
            score: item.score,
        }
    }
}

/// Request to train (index) a source tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    /// File or directory to index
    pub path: String,
    /// Discard the manifest and the index before indexing
    #[serde(default)]
    pub full: bool,
}

/// Response from a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainResponse {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_unchanged: usize,
    pub files_removed: usize,
    pub chunks_created: usize,
    pub embeddings_generated: usize,
    pub duration_ms: u64,
    /// Non-fatal problems (unreadable files)
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Request to retrieve context for a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub mode: PartitionMode,
}

fn default_top_k() -> usize {
    8
}

impl QueryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError::Empty("query".to_string()));
        }
        if self.top_k == 0 {
            return Err(ValidationError::InvalidValue(
                "top_k".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Response from a retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Contexts grouped by file, groups in rank order
    pub contexts: Vec<RetrievedContext>,
    pub duration_ms: u64,
}

/// Response from knowledge ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeResponse {
    pub documents: usize,
    pub sections: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Statistics about the indexed tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub total_files: usize,
    pub total_chunks: usize,
    pub index_items: usize,
    pub trained_at: Option<String>,
    pub language_breakdown: Vec<LanguageStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub language: String,
    pub file_count: usize,
    pub chunk_count: usize,
}
