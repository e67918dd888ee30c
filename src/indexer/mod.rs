//! Source discovery, language classification and boundary-aware chunking
//!
//! Provides functionality to walk a tree, classify files by language, and split
//! each file into overlapping line-range chunks that prefer to end right before
//! a function, class or type boundary.

mod chunker;
mod file_walker;
pub mod ignore_rules;
pub mod knowledge;
pub mod language;

pub use chunker::{ChunkConfig, ChunkedFiles, CodeChunker, classify_chunk};
pub use file_walker::FileWalker;
pub use ignore_rules::IgnoreRules;
pub use knowledge::{KnowledgeSection, is_knowledge_document, split_markdown};
pub use language::{Language, boundary_pattern, class_pattern, classify, import_pattern, is_supported};

use crate::types::{ChunkKind, CodeMetadata, ItemMetadata};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};

/// A discovered file; recomputed from the filesystem on every run
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    pub language: Language,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: f64,
}

impl SourceFile {
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time of {:?}", path))?;
        let mtime = modified
            .duration_since(UNIX_EPOCH)
            .map(mtime_millis)
            .unwrap_or(0.0);

        Ok(Self {
            language: classify(&path),
            path,
            mtime,
        })
    }

    /// Manifest key for this file
    pub fn key(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Milliseconds since the epoch, keeping sub-millisecond precision
pub(crate) fn mtime_millis(since_epoch: Duration) -> f64 {
    since_epoch.as_nanos() as f64 / 1_000_000.0
}

/// Represents a code chunk ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    /// Absolute path of the owning file
    pub file_path: String,
    pub language: Language,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub content: String,
    pub kind: ChunkKind,
}

impl CodeChunk {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Denormalized form written into the vector index
    pub fn to_metadata(&self) -> ItemMetadata {
        ItemMetadata::Code(CodeMetadata {
            text: self.content.clone(),
            file_path: self.file_path.clone(),
            language: self.language.as_str().to_string(),
            start_line: self.start_line,
            end_line: self.end_line,
            chunk_kind: self.kind,
        })
    }
}
