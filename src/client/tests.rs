use super::*;
use crate::embedding::HashingEmbedder;
use crate::error::{RagError, ValidationError};
use crate::vector_db::InMemoryVectorIndex;
use std::fs;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.path().join("data");
    config.embedding.model_name = "hashing-64".to_string();
    config
}

/// Root with two Rust files whose chunk texts share vocabulary with the queries below
fn create_tree(dir: &TempDir) -> PathBuf {
    let root = dir.path().join("repo");
    fs::create_dir_all(root.join("src")).unwrap();

    let mut session = String::new();
    for i in 1..=60 {
        session.push_str(&format!("// session refresh token expiry step {}\n", i));
    }
    fs::write(root.join("src/session.rs"), session).unwrap();

    let mut parser = String::new();
    for i in 1..=20 {
        parser.push_str(&format!("// parser grammar rule {}\n", i));
    }
    fs::write(root.join("src/parser.rs"), parser).unwrap();

    root.canonicalize().unwrap()
}

fn memory_client(dir: &TempDir, root: &Path) -> RagClient {
    RagClient::with_components(
        test_config(dir),
        root,
        Arc::new(HashingEmbedder::new(64)),
        Arc::new(InMemoryVectorIndex::new()),
        dir.path().join("manifest.json"),
    )
    .unwrap()
}

#[tokio::test]
async fn test_with_components_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.chunking.min_lines = 50;

    let result = RagClient::with_components(
        config,
        dir.path(),
        Arc::new(HashingEmbedder::new(8)),
        Arc::new(InMemoryVectorIndex::new()),
        dir.path().join("manifest.json"),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_retrieve_groups_by_file() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);
    client.train(false).await.unwrap();

    let response = client
        .retrieve("session refresh token expiry", 3, PartitionMode::Code)
        .await
        .unwrap();
    assert_eq!(response.contexts.len(), 3);

    // Chunks of one file are contiguous and ordered by start line
    let mut seen_files: Vec<&str> = Vec::new();
    let mut last_line: Option<(&str, usize)> = None;
    for context in &response.contexts {
        let origin = context.metadata.origin();
        let line = context.metadata.start_line().unwrap();
        match last_line {
            Some((file, prev)) if file == origin => assert!(prev < line),
            _ => {
                assert!(!seen_files.contains(&origin));
                seen_files.push(origin);
            }
        }
        last_line = Some((origin, line));
    }
}

#[tokio::test]
async fn test_retrieve_both_mode_mixes_partitions() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);
    client.train(false).await.unwrap();

    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("auth.md"),
        "# Sessions\nsession refresh token expiry policy\n",
    )
    .unwrap();
    client.ingest_knowledge(&docs).await.unwrap();

    let response = client
        .retrieve("session refresh token expiry", 4, PartitionMode::Both)
        .await
        .unwrap();
    assert!(response.contexts.len() <= 4);
    assert!(
        response
            .contexts
            .iter()
            .any(|c| c.metadata.partition() == Partition::Knowledge)
    );

    let knowledge_only = client
        .retrieve("session refresh", 4, PartitionMode::Knowledge)
        .await
        .unwrap();
    assert_eq!(knowledge_only.contexts.len(), 1);
    assert_eq!(knowledge_only.contexts[0].text, "# Sessions\nsession refresh token expiry policy");
}

#[tokio::test]
async fn test_query_validation() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);

    let err = client.retrieve("  ", 4, PartitionMode::Code).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::Empty(_))
    ));
    assert!(RagError::from(err).is_user_error());

    assert!(client.retrieve("parser", 0, PartitionMode::Code).await.is_err());
}

#[tokio::test]
async fn test_retrieve_before_training_is_empty() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);

    let response = client.retrieve("parser", 4, PartitionMode::Both).await.unwrap();
    assert!(response.contexts.is_empty());
}

#[tokio::test]
async fn test_statistics() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);

    let empty = client.statistics().await.unwrap();
    assert_eq!(empty.total_files, 0);
    assert!(empty.trained_at.is_none());

    let trained = client.train(false).await.unwrap();
    let stats = client.statistics().await.unwrap();
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_chunks, trained.chunks_created);
    assert_eq!(stats.index_items, trained.chunks_created);
    assert!(stats.trained_at.is_some());
    assert_eq!(
        stats.language_breakdown,
        vec![LanguageStats {
            language: "rust".to_string(),
            file_count: 2,
            chunk_count: trained.chunks_created,
        }]
    );
}

#[tokio::test]
async fn test_clear_removes_items_and_manifest() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let client = memory_client(&dir, &root);
    client.train(false).await.unwrap();
    assert!(client.manifest_path().exists());

    client.clear().await.unwrap();
    assert!(!client.manifest_path().exists());
    assert_eq!(client.statistics().await.unwrap().index_items, 0);

    // The next run starts from scratch
    let response = client.train(false).await.unwrap();
    assert_eq!(response.files_processed, 2);
}

#[tokio::test]
async fn test_open_uses_per_root_store() {
    let dir = TempDir::new().unwrap();
    let root = create_tree(&dir);
    let config = test_config(&dir);
    let data_dir = config.storage.data_dir.clone();

    let client = RagClient::open(config, &root).await.unwrap();
    assert_eq!(client.root(), root.as_path());
    assert_eq!(
        client.manifest_path(),
        PlatformPaths::manifest_path(&data_dir, &root).as_path()
    );
    assert_eq!(client.embedding_dimension(), 64);

    let response = client.train(false).await.unwrap();
    assert_eq!(response.files_processed, 2);
    assert!(PlatformPaths::lancedb_path(&data_dir, &root).exists());

    let results = client
        .retrieve("parser grammar rule", 2, PartitionMode::Code)
        .await
        .unwrap();
    assert!(!results.contexts.is_empty());
    client.close().await.unwrap();

    // A reopened client sees the same index and manifest
    let reopened = RagClient::open(test_config(&dir), &root).await.unwrap();
    let response = reopened.train(false).await.unwrap();
    assert_eq!(response.files_processed, 0);
    assert_eq!(response.files_unchanged, 2);
}

#[tokio::test]
async fn test_open_missing_root() {
    let dir = TempDir::new().unwrap();
    let err = RagClient::open(test_config(&dir), dir.path().join("missing"))
        .await
        .err()
        .unwrap();
    assert!(RagError::from(err).is_user_error());
}
