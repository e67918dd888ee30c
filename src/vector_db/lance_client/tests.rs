use super::*;
use crate::types::KnowledgeMetadata;
use tempfile::TempDir;

fn code(file_path: &str, start_line: usize) -> ItemMetadata {
    ItemMetadata::Code(CodeMetadata {
        text: format!("fn item_{}() {{}}", start_line),
        file_path: file_path.to_string(),
        language: "rust".to_string(),
        start_line,
        end_line: start_line + 9,
        chunk_kind: ChunkKind::Function,
    })
}

fn knowledge(source: &str, section: &str) -> ItemMetadata {
    ItemMetadata::Knowledge(KnowledgeMetadata {
        text: format!("## {}\nbody", section),
        source: source.to_string(),
        section: section.to_string(),
    })
}

async fn open_index(temp_dir: &TempDir) -> LanceVectorIndex {
    LanceVectorIndex::open(&temp_dir.path().join("lancedb"))
        .await
        .unwrap()
}

async fn seeded(temp_dir: &TempDir) -> LanceVectorIndex {
    let index = open_index(temp_dir).await;
    index.initialize(3).await.unwrap();
    index.begin_update().await.unwrap();
    index.insert(vec![1.0, 0.0, 0.0], code("/src/a.rs", 1)).await.unwrap();
    index.insert(vec![0.0, 1.0, 0.0], code("/src/a.rs", 36)).await.unwrap();
    index.insert(vec![0.0, 0.0, 1.0], code("/src/it's.rs", 1)).await.unwrap();
    index
        .insert(vec![0.9, 0.1, 0.0], knowledge("/docs/guide.md", "Setup"))
        .await
        .unwrap();
    assert_eq!(index.end_update().await.unwrap(), 4);
    index
}

#[tokio::test]
async fn test_open_creates_instance() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    assert_eq!(index.table_name, "items");
    assert!(index.db_path.ends_with("lancedb"));
}

#[tokio::test]
async fn test_count_before_initialize_is_zero() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();
    index.initialize(3).await.unwrap();

    let table_names = index.connection.table_names().execute().await.unwrap();
    assert!(table_names.contains(&"items".to_string()));
}

#[tokio::test]
async fn test_initialize_rejects_other_dimension() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();

    let err = index.initialize(4).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VectorDbError>(),
        Some(VectorDbError::Integrity(_))
    ));
}

#[tokio::test]
async fn test_query_roundtrips_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let index = seeded(&temp_dir).await;

    let results = index.query(&[1.0, 0.0, 0.0], 4, None).await.unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].metadata, code("/src/a.rs", 1));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| r.score > 0.0 && r.score <= 1.0));
    assert!(
        results
            .iter()
            .any(|r| r.metadata == knowledge("/docs/guide.md", "Setup"))
    );
}

#[tokio::test]
async fn test_query_with_partition_filter() {
    let temp_dir = TempDir::new().unwrap();
    let index = seeded(&temp_dir).await;

    let code_only = index
        .query(&[1.0, 0.0, 0.0], 10, Some(Partition::Code))
        .await
        .unwrap();
    assert_eq!(code_only.len(), 3);
    assert!(code_only.iter().all(|r| r.metadata.partition() == Partition::Code));

    let knowledge_only = index
        .query(&[1.0, 0.0, 0.0], 10, Some(Partition::Knowledge))
        .await
        .unwrap();
    assert_eq!(knowledge_only.len(), 1);
    assert_eq!(knowledge_only[0].metadata.origin(), "/docs/guide.md");
}

#[tokio::test]
async fn test_query_empty_table() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();
    assert!(index.query(&[1.0, 0.0, 0.0], 5, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_reports_damaged_table() {
    let temp_dir = TempDir::new().unwrap();
    {
        let _index = seeded(&temp_dir).await;
    }

    let data_dir = temp_dir.path().join("lancedb").join("items.lance").join("data");
    for entry in std::fs::read_dir(&data_dir).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    // A table that cannot be read is an error, never an empty result
    let reopened = open_index(&temp_dir).await;
    assert!(reopened.query(&[1.0, 0.0, 0.0], 5, None).await.is_err());
}

#[tokio::test]
async fn test_items_invisible_until_end_update() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();

    index.begin_update().await.unwrap();
    index.insert(vec![1.0, 0.0, 0.0], code("/src/a.rs", 1)).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);

    index.cancel_update().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);

    index.begin_update().await.unwrap();
    index.insert(vec![1.0, 0.0, 0.0], code("/src/a.rs", 1)).await.unwrap();
    assert_eq!(index.end_update().await.unwrap(), 1);
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_without_update_fails() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();

    let err = index
        .insert(vec![1.0, 0.0, 0.0], code("/src/a.rs", 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VectorDbError>(),
        Some(VectorDbError::NoActiveUpdate)
    ));
}

#[tokio::test]
async fn test_end_update_rejects_wrong_dimension() {
    let temp_dir = TempDir::new().unwrap();
    let index = open_index(&temp_dir).await;
    index.initialize(3).await.unwrap();

    index.begin_update().await.unwrap();
    index.insert(vec![1.0, 0.0], code("/src/a.rs", 1)).await.unwrap();
    assert!(index.end_update().await.is_err());
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_by_path() {
    let temp_dir = TempDir::new().unwrap();
    let index = seeded(&temp_dir).await;

    index.delete_by_path(Partition::Code, "/src/a.rs").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 2);

    // Quotes in paths are escaped
    index.delete_by_path(Partition::Code, "/src/it's.rs").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);

    // Knowledge items are only removed through their own partition
    index.delete_by_path(Partition::Code, "/docs/guide.md").await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);
    index
        .delete_by_path(Partition::Knowledge, "/docs/guide.md")
        .await
        .unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_clear_then_reinitialize() {
    let temp_dir = TempDir::new().unwrap();
    let index = seeded(&temp_dir).await;

    index.clear().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);

    // Clearing drops the table, so a different dimension is accepted afterwards
    index.initialize(5).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_data_persists_across_connections() {
    let temp_dir = TempDir::new().unwrap();
    {
        let _index = seeded(&temp_dir).await;
    }

    let reopened = open_index(&temp_dir).await;
    reopened.initialize(3).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 4);
}

#[test]
fn test_sql_literal_escapes_quotes() {
    assert_eq!(sql_literal("code"), "'code'");
    assert_eq!(sql_literal("it's"), "'it''s'");
}
