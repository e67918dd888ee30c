//! File discovery for indexing runs

use super::SourceFile;
use super::ignore_rules::IgnoreRules;
use super::language::is_supported;
use crate::error::IndexingError;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_MAX_FILE_SIZE: usize = 1_048_576;

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    accept: fn(&Path) -> bool,
    kind: &'static str,
}

impl FileWalker {
    /// Walker accepting every file the language classifier recognises
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            accept: is_supported,
            kind: "source",
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Replace the file predicate, e.g. to discover documents instead of code
    pub fn with_filter(mut self, kind: &'static str, accept: fn(&Path) -> bool) -> Self {
        self.kind = kind;
        self.accept = accept;
        self
    }

    /// Sorted absolute paths of every accepted file under the root
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(IndexingError::InvalidPath(format!(
                "{} does not exist",
                self.root.display()
            ))
            .into());
        }

        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", self.root.display()))
            .map_err(|e| IndexingError::InvalidPath(format!("{:#}", e)))?;

        if root.is_file() {
            if !(self.accept)(&root) {
                return Err(IndexingError::UnsupportedFileType(root.display().to_string()).into());
            }
            return Ok(vec![root]);
        }

        let rules = Arc::new(IgnoreRules::for_root(&root)?);
        let mut files = self.walk(&root, rules)?;

        if files.is_empty() {
            return Err(IndexingError::NoSourceFilesFound(root.display().to_string()).into());
        }

        files.sort();
        tracing::info!("Found {} {} files under {:?}", files.len(), self.kind, root);
        Ok(files)
    }

    /// Discovery plus the modification time of each file
    pub fn discover_files(&self) -> Result<Vec<SourceFile>> {
        Ok(stat_files(self.discover()?))
    }

    fn walk(&self, root: &Path, rules: Arc<IgnoreRules>) -> Result<Vec<PathBuf>> {
        let filter_root = root.to_path_buf();
        let filter_rules = Arc::clone(&rules);

        // .gitignore is handled by our own rules, so the crate's filters stay off
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                let Ok(relative) = entry.path().strip_prefix(&filter_root) else {
                    return true;
                };
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !filter_rules.is_ignored(relative, is_dir)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .map_err(|e| IndexingError::WalkFailed(e.to_string()))
                .context("Failed to read directory entry")?;

            let path = entry.path();
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            // Links to files are indexed under the link's path; linked directories are not walked
            if file_type.is_symlink() {
                if !fs::metadata(path).is_ok_and(|m| m.is_file()) {
                    tracing::debug!("Skipping symlink that is not a file: {:?}", path);
                    continue;
                }
            } else if !file_type.is_file() {
                continue;
            }

            if !(self.accept)(path) {
                continue;
            }

            if let Ok(metadata) = fs::metadata(path)
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {:?}", path);
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }
}

/// Attach modification times; a file that vanished since the walk is skipped
fn stat_files(paths: Vec<PathBuf>) -> Vec<SourceFile> {
    paths
        .into_iter()
        .filter_map(|path| match SourceFile::from_path(path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!("Skipping file: {:#}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
