/// Centralized platform-specific path computation
///
/// Provides consistent path handling across Windows, macOS, and Linux following
/// XDG Base Directory specification on Unix-like systems.
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "repo-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("LOCALAPPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    std::env::var("HOME").map(|home| PathBuf::from(home).join(".local/share"))
                })
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// Returns: {data_dir}/repo-rag
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR_NAME)
    }

    /// Returns: {config_dir}/repo-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join(APP_DIR_NAME).join("config.toml")
    }

    /// Short stable identifier for an indexed root
    pub fn hash_root_path(root: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(root.to_string_lossy().as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }

    /// Store directory holding the manifest and the index for one root
    ///
    /// Returns: {base}/indexes/{hash(root)}
    pub fn store_dir(base: &Path, root: &Path) -> PathBuf {
        base.join("indexes").join(Self::hash_root_path(root))
    }

    /// Returns: {store_dir}/manifest.json
    pub fn manifest_path(base: &Path, root: &Path) -> PathBuf {
        Self::store_dir(base, root).join("manifest.json")
    }

    /// Returns: {store_dir}/lancedb
    pub fn lancedb_path(base: &Path, root: &Path) -> PathBuf {
        Self::store_dir(base, root).join("lancedb")
    }
}
