//! Ignore rules applied during discovery
//!
//! A fixed built-in list (dependency, build and cache directories, lockfiles,
//! generated files) is unioned with the rules of the root's own `.gitignore`.
//! Rules are compiled into two [`GlobSet`]s matched against root-relative,
//! `/`-separated paths: one checked for every entry, one only for directories.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Directories never descended into
pub const BUILTIN_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "bower_components",
    "target",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
    ".gradle",
    ".idea",
    ".vscode",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    "vendor",
];

/// Individual files never indexed
pub const BUILTIN_IGNORED_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.generated.*",
    "*.pb.go",
    "*_pb2.py",
];

const IGNORE_FILE_NAME: &str = ".gitignore";

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    paths: GlobSet,
    dirs: GlobSet,
    rule_count: usize,
}

struct RuleSetBuilder {
    paths: GlobSetBuilder,
    dirs: GlobSetBuilder,
    rule_count: usize,
}

impl RuleSetBuilder {
    fn new() -> Self {
        Self {
            paths: GlobSetBuilder::new(),
            dirs: GlobSetBuilder::new(),
            rule_count: 0,
        }
    }

    fn add(set: &mut GlobSetBuilder, pattern: &str) -> Result<()> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
        set.add(glob);
        Ok(())
    }

    /// A directory name excluded at any depth
    fn add_dir_name(&mut self, name: &str) -> Result<()> {
        Self::add(&mut self.dirs, &format!("**/{}", name))?;
        Self::add(&mut self.paths, &format!("**/{}/**", name))?;
        self.rule_count += 1;
        Ok(())
    }

    /// A file name (or glob) excluded at any depth
    fn add_file_name(&mut self, name: &str) -> Result<()> {
        Self::add(&mut self.paths, &format!("**/{}", name))?;
        self.rule_count += 1;
        Ok(())
    }

    /// One `.gitignore` line; returns false when the line holds no rule
    fn add_gitignore_line(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(false);
        }
        if line.starts_with('!') {
            // Re-inclusion is not supported; the file stays excluded
            tracing::debug!("Ignoring negated rule in {}: {}", IGNORE_FILE_NAME, line);
            return Ok(false);
        }

        if let Some(dir) = line.strip_suffix('/') {
            // Directory rules are anchored to the root
            let dir = dir.trim_start_matches('/');
            if dir.is_empty() {
                return Ok(false);
            }
            Self::add(&mut self.dirs, dir)?;
            Self::add(&mut self.paths, &format!("{}/**", dir))?;
        } else {
            let pattern = line.trim_start_matches('/');
            if pattern.is_empty() {
                return Ok(false);
            }
            Self::add(&mut self.paths, &format!("**/{}", pattern))?;
            Self::add(&mut self.paths, &format!("**/{}/**", pattern))?;
        }
        self.rule_count += 1;
        Ok(true)
    }

    fn build(self) -> Result<IgnoreRules> {
        Ok(IgnoreRules {
            paths: self.paths.build().context("Failed to compile ignore rules")?,
            dirs: self.dirs.build().context("Failed to compile ignore rules")?,
            rule_count: self.rule_count,
        })
    }
}

impl IgnoreRules {
    /// Built-in rules only
    pub fn builtin() -> Result<Self> {
        Self::builtin_builder()?.build()
    }

    fn builtin_builder() -> Result<RuleSetBuilder> {
        let mut builder = RuleSetBuilder::new();
        for dir in BUILTIN_IGNORED_DIRS {
            builder.add_dir_name(dir)?;
        }
        for file in BUILTIN_IGNORED_FILES {
            builder.add_file_name(file)?;
        }
        Ok(builder)
    }

    /// Built-in rules plus the lines of a `.gitignore` body
    pub fn with_gitignore(contents: &str) -> Result<Self> {
        let mut builder = Self::builtin_builder()?;
        let mut parsed = 0;
        for line in contents.lines() {
            match builder.add_gitignore_line(line) {
                Ok(true) => parsed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Skipping {} rule '{}': {:#}", IGNORE_FILE_NAME, line, e),
            }
        }
        tracing::debug!("Parsed {} rules from {}", parsed, IGNORE_FILE_NAME);
        builder.build()
    }

    /// Rules for a tree: built-ins plus `<root>/.gitignore` when present
    pub fn for_root(root: &Path) -> Result<Self> {
        let ignore_file = root.join(IGNORE_FILE_NAME);
        if !ignore_file.is_file() {
            return Self::builtin();
        }

        match std::fs::read_to_string(&ignore_file) {
            Ok(contents) => Self::with_gitignore(&contents),
            Err(e) => {
                tracing::warn!("Failed to read {:?}, using built-in rules: {}", ignore_file, e);
                Self::builtin()
            }
        }
    }

    /// Whether a root-relative path is excluded
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        let normalized = relative.to_string_lossy().replace('\\', "/");
        if normalized.is_empty() {
            return false;
        }
        self.paths.is_match(&normalized) || (is_dir && self.dirs.is_match(&normalized))
    }

    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}
