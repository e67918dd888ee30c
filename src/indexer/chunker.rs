use super::language::{Language, boundary_pattern, class_pattern, import_pattern};
use super::{CodeChunk, SourceFile};
use crate::error::{ChunkingError, IndexingError};
use crate::types::ChunkKind;
use anyhow::Result;

/// Chunk sizing, in lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Shorter chunks are never emitted; shorter files are not indexed
    pub min_lines: usize,
    /// Preferred chunk length
    pub target_lines: usize,
    /// How far past the target a boundary is searched for
    pub max_lines: usize,
    /// Lines shared by consecutive chunks
    pub overlap_lines: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_lines: 5,
            target_lines: 40,
            max_lines: 80,
            overlap_lines: 5,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.min_lines == 0 {
            return Err(ChunkingError::InvalidParameters(
                "min_lines must be greater than 0".to_string(),
            ));
        }
        if self.min_lines > self.target_lines || self.target_lines > self.max_lines {
            return Err(ChunkingError::InvalidParameters(format!(
                "expected min <= target <= max, got {} / {} / {}",
                self.min_lines, self.target_lines, self.max_lines
            )));
        }
        if self.overlap_lines >= self.target_lines {
            return Err(ChunkingError::InvalidParameters(format!(
                "overlap ({}) must be smaller than target ({})",
                self.overlap_lines, self.target_lines
            )));
        }
        Ok(())
    }
}

/// Result of chunking a batch of files
#[derive(Debug, Default)]
pub struct ChunkedFiles {
    /// One entry per readable file, in input order; may hold zero chunks
    pub files: Vec<(SourceFile, Vec<CodeChunk>)>,
    /// Files that could not be read, with the reason
    pub failures: Vec<String>,
}

impl ChunkedFiles {
    pub fn chunk_count(&self) -> usize {
        self.files.iter().map(|(_, chunks)| chunks.len()).sum()
    }
}

pub struct CodeChunker {
    config: ChunkConfig,
}

impl CodeChunker {
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkingError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split one file's text into line-range chunks
    pub fn chunk_text(&self, file_path: &str, language: Language, content: &str) -> Vec<CodeChunk> {
        let lines: Vec<&str> = content.lines().collect();
        let n = lines.len();
        let ChunkConfig {
            min_lines,
            target_lines,
            max_lines,
            overlap_lines,
        } = self.config;

        let make_chunk = |start: usize, end: usize| {
            let slice = &lines[start..end];
            CodeChunk {
                file_path: file_path.to_string(),
                language,
                start_line: start + 1,
                end_line: end,
                content: slice.join("\n"),
                kind: classify_chunk(slice, language),
            }
        };

        if n <= target_lines {
            if n < min_lines {
                return Vec::new();
            }
            return vec![make_chunk(0, n)];
        }

        let boundary = boundary_pattern(language);
        let mut chunks = Vec::with_capacity(n / (target_lines - overlap_lines) + 1);
        let mut start = 0;

        while start < n {
            let mut end = (start + target_lines).min(n);

            if end < n {
                let window_end = (start + max_lines).min(n);
                if let Some(split) =
                    (start + target_lines..window_end).find(|&i| boundary.is_match(lines[i]))
                {
                    end = split;
                }
            }

            if end - start >= min_lines {
                chunks.push(make_chunk(start, end));
            }

            if end == n {
                break;
            }

            let next = end.saturating_sub(overlap_lines);
            start = if next > start { next } else { end };
        }

        chunks
    }

    /// Read and chunk one file
    pub fn chunk_file(&self, file: &SourceFile) -> Result<Vec<CodeChunk>> {
        let content = std::fs::read_to_string(&file.path).map_err(|e| {
            IndexingError::FileReadFailed {
                file: file.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(self.chunk_text(&file.key(), file.language, &content))
    }

    /// Chunk files one at a time; unreadable files are skipped and reported
    pub fn chunk_files(&self, files: &[SourceFile]) -> ChunkedFiles {
        let mut result = ChunkedFiles::default();

        for file in files {
            match self.chunk_file(file) {
                Ok(chunks) => {
                    tracing::debug!("Chunked {:?} into {} chunks", file.path, chunks.len());
                    result.files.push((file.clone(), chunks));
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {:#}", file.path, e);
                    result.failures.push(format!("{:#}", e));
                }
            }
        }

        result
    }
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }
}

/// Classify a chunk by its first non-blank line
pub fn classify_chunk(lines: &[&str], language: Language) -> ChunkKind {
    let Some(first) = lines.iter().find(|line| !line.trim().is_empty()) else {
        return ChunkKind::General;
    };

    if import_pattern(language).is_match(first) {
        ChunkKind::Imports
    } else if class_pattern(language).is_match(first) {
        ChunkKind::Class
    } else if boundary_pattern(language).is_match(first) {
        ChunkKind::Function
    } else {
        ChunkKind::General
    }
}
