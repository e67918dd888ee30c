//! # repo-rag - incremental codebase indexing and file-coherent retrieval
//!
//! repo-rag indexes a source tree into a local vector store and serves ranked
//! context snippets for a retrieval-augmented fix loop.
//!
//! ## Overview
//!
//! Files are split into overlapping line-range chunks that prefer to end just
//! before a function, class or type declaration. Each run compares file
//! modification times with a persisted manifest, so only new or modified files
//! are re-chunked and re-embedded. Retrieval can consult the code partition,
//! a knowledge partition built from markdown documents, or both; results are
//! grouped by file so chunks of one file read in source order.
//!
//! ## Architecture
//!
//! ```text
//!  train:  FileWalker -> TrainManifest::diff -> CodeChunker -> EmbeddingBatcher -> VectorIndex
//!  query:  query text -> EmbeddingBatcher -> Retriever -> VectorIndex -> group_by_file
//! ```
//!
//! ## Modules
//!
//! - [`client`]: [`RagClient`], the pipeline for one indexed root
//! - [`indexer`]: Discovery, language classification, chunking and markdown sections
//! - [`manifest`]: Persisted mtimes and the incremental diff
//! - [`embedding`]: Embedding providers and the batch coordinator
//! - [`vector_db`]: Vector index trait with LanceDB and in-memory implementations
//! - [`retriever`]: Partitioned queries, merging and file grouping
//! - [`config`]: Configuration with environment variable overrides
//! - [`types`]: Request/response and metadata types
//! - [`error`]: Error types
//! - [`paths`]: Platform directories and per-root store layout
//!
//! ## Usage Example
//!
//! ```no_run
//! use repo_rag::{Config, PartitionMode, RagClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RagClient::open(Config::new()?, ".").await?;
//!     client.train(false).await?;
//!
//!     let response = client.retrieve("how are retries scheduled", 8, PartitionMode::Code).await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!
//!     client.close().await
//! }
//! ```

/// Pipeline client bound to one indexed root
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding providers and batched, order-preserving embedding
pub mod embedding;

/// Error types and utilities
pub mod error;

/// File discovery, language patterns and boundary-aware chunking
pub mod indexer;

/// Train manifest for incremental re-indexing
pub mod manifest;

/// Platform directories and store layout
pub mod paths;

/// Partition-aware retrieval and file grouping
pub mod retriever;

/// Request/response and stored metadata types
pub mod types;

/// Vector index abstraction (LanceDB and in-memory)
pub mod vector_db;

pub use client::RagClient;
pub use config::Config;
pub use error::RagError;
pub use types::*;
