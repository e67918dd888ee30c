//! Persisted record of indexed files, used to re-index only what changed

use crate::error::ManifestError;
use crate::indexer::SourceFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Bumped whenever the on-disk layout or the chunking scheme changes
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Milliseconds since the Unix epoch
    pub mtime: f64,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainManifest {
    pub version: u32,
    /// ISO-8601 timestamp of the run that wrote this manifest
    pub trained_at: String,
    /// Absolute path -> entry
    pub files: BTreeMap<String, ManifestEntry>,
}

/// How the discovered files relate to the previous run
#[derive(Debug, Default)]
pub struct ManifestDiff {
    /// Present in the manifest with an identical mtime
    pub unchanged: Vec<SourceFile>,
    /// New, or modified since the previous run
    pub to_process: Vec<SourceFile>,
    /// In the manifest but no longer discovered
    pub removed: Vec<String>,
}

impl ManifestDiff {
    /// Nothing to embed, write or forget
    pub fn is_noop(&self) -> bool {
        self.to_process.is_empty() && self.removed.is_empty()
    }
}

impl Default for TrainManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            trained_at: chrono::Utc::now().to_rfc3339(),
            files: BTreeMap::new(),
        }
    }
}

impl TrainManifest {
    /// Load the manifest; a missing, unreadable or incompatible file yields `None`
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            tracing::debug!("No manifest at {:?}, starting a full run", path);
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read manifest {:?}, treating as absent: {}", path, e);
                return None;
            }
        };

        let manifest: TrainManifest = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!("Corrupt manifest {:?}, treating as absent: {}", path, e);
                return None;
            }
        };

        if manifest.version != MANIFEST_VERSION {
            tracing::warn!(
                "Manifest {:?} has version {}, expected {}; treating as absent",
                path,
                manifest.version,
                MANIFEST_VERSION
            );
            return None;
        }

        tracing::info!("Loaded manifest with {} files", manifest.files.len());
        Some(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let failed = |reason: String| ManifestError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        fs::write(path, content).map_err(|e| failed(e.to_string()))?;

        tracing::debug!("Saved manifest to {:?}", path);
        Ok(())
    }

    /// Delete a manifest file; a missing file is not an error
    pub fn remove(path: &Path) -> Result<(), ManifestError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManifestError::RemoveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Partition discovered files against this manifest
    pub fn diff(&self, files: &[SourceFile]) -> ManifestDiff {
        let mut diff = ManifestDiff::default();
        let mut seen = std::collections::HashSet::with_capacity(files.len());

        for file in files {
            let key = file.key();
            match self.files.get(&key) {
                Some(entry) if entry.mtime == file.mtime => diff.unchanged.push(file.clone()),
                _ => diff.to_process.push(file.clone()),
            }
            seen.insert(key);
        }

        diff.removed = self
            .files
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();

        diff
    }

    /// Manifest after a run: unchanged entries verbatim plus one entry per processed file
    pub fn next(&self, diff: &ManifestDiff, processed: &[(SourceFile, usize)]) -> TrainManifest {
        let mut files = BTreeMap::new();

        for file in &diff.unchanged {
            let key = file.key();
            if let Some(entry) = self.files.get(&key) {
                files.insert(key, entry.clone());
            }
        }

        for (file, chunk_count) in processed {
            files.insert(
                file.key(),
                ManifestEntry {
                    mtime: file.mtime,
                    chunk_count: *chunk_count,
                },
            );
        }

        TrainManifest {
            version: MANIFEST_VERSION,
            trained_at: chrono::Utc::now().to_rfc3339(),
            files,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.files.values().map(|e| e.chunk_count).sum()
    }
}
