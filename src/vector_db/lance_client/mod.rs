//! LanceDB vector index (embedded, no server required)
//!
//! One table holds both partitions. Code and knowledge items share the
//! `origin` column (file path or document source) so stale items of either
//! kind can be deleted with a single predicate.

use super::{PendingItems, UpdateBuffer, VectorIndex};
use crate::error::VectorDbError;
use crate::types::{
    ChunkKind, CodeMetadata, ItemMetadata, KnowledgeMetadata, Partition, ScoredItem,
};
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::path::Path;
use std::sync::Arc;

const TABLE_NAME: &str = "items";

pub struct LanceVectorIndex {
    connection: Connection,
    table_name: String,
    db_path: String,
    update: UpdateBuffer,
}

impl LanceVectorIndex {
    /// Open (or create) the database directory at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let db_path = path.to_string_lossy().to_string();
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(&db_path)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(format!("{}: {}", db_path, e)))?;

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            db_path,
            update: UpdateBuffer::default(),
        })
    }

    /// Create schema for the items table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("partition", DataType::Utf8, false),
            Field::new("origin", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("language", DataType::Utf8, true),
            Field::new("start_line", DataType::UInt32, true),
            Field::new("end_line", DataType::UInt32, true),
            Field::new("chunk_kind", DataType::Utf8, true),
            Field::new("section", DataType::Utf8, true),
        ]))
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.contains(&self.table_name))
    }

    /// Get the items table; fails if `initialize` has not created it
    async fn get_table(&self) -> Result<Table> {
        if !self.table_exists().await? {
            return Err(VectorDbError::NotInitialized.into());
        }
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(e.to_string()))
            .context("Failed to open table")
    }

    async fn table_dimension(table: &Table) -> Result<Option<usize>> {
        let schema = table.schema().await.context("Failed to read table schema")?;
        let dimension = schema.field_with_name("vector").ok().and_then(|field| {
            match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            }
        });
        Ok(dimension)
    }

    /// Convert pending items to a RecordBatch
    fn create_record_batch(items: PendingItems, schema: Arc<Schema>) -> Result<RecordBatch> {
        let dimension = match schema.field_with_name("vector")?.data_type() {
            DataType::FixedSizeList(_, size) => *size,
            other => {
                return Err(VectorDbError::Integrity(format!(
                    "vector column has type {:?}",
                    other
                ))
                .into());
            }
        };

        let mut partitions = Vec::with_capacity(items.len());
        let mut origins = Vec::with_capacity(items.len());
        let mut texts = Vec::with_capacity(items.len());
        let mut languages = Vec::with_capacity(items.len());
        let mut start_lines = Vec::with_capacity(items.len());
        let mut end_lines = Vec::with_capacity(items.len());
        let mut chunk_kinds = Vec::with_capacity(items.len());
        let mut sections = Vec::with_capacity(items.len());
        let mut vectors = Vec::with_capacity(items.len());

        for (vector, metadata) in items {
            if vector.len() != dimension as usize {
                return Err(VectorDbError::StoreFailed(format!(
                    "vector has {} dimensions, table expects {}",
                    vector.len(),
                    dimension
                ))
                .into());
            }
            vectors.push(Some(vector.into_iter().map(Some)));
            partitions.push(metadata.partition().as_str());

            match metadata {
                ItemMetadata::Code(code) => {
                    origins.push(code.file_path);
                    texts.push(code.text);
                    languages.push(Some(code.language));
                    start_lines.push(Some(code.start_line as u32));
                    end_lines.push(Some(code.end_line as u32));
                    chunk_kinds.push(Some(code.chunk_kind.as_str()));
                    sections.push(None);
                }
                ItemMetadata::Knowledge(knowledge) => {
                    origins.push(knowledge.source);
                    texts.push(knowledge.text);
                    languages.push(None);
                    start_lines.push(None);
                    end_lines.push(None);
                    chunk_kinds.push(None);
                    sections.push(Some(knowledge.section));
                }
            }
        }

        let vector_array =
            FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dimension);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(StringArray::from(partitions)),
                Arc::new(StringArray::from(origins)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(languages)),
                Arc::new(UInt32Array::from(start_lines)),
                Arc::new(UInt32Array::from(end_lines)),
                Arc::new(StringArray::from(chunk_kinds)),
                Arc::new(StringArray::from(sections)),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    /// Decode query results; any missing column or value is an integrity error
    fn decode_results(batches: &[RecordBatch]) -> Result<Vec<ScoredItem>> {
        let mut results = Vec::new();

        for batch in batches {
            let partition = string_column(batch, "partition")?;
            let origin = string_column(batch, "origin")?;
            let text = string_column(batch, "text")?;
            let language = string_column(batch, "language")?;
            let chunk_kind = string_column(batch, "chunk_kind")?;
            let section = string_column(batch, "section")?;
            let start_line = u32_column(batch, "start_line")?;
            let end_line = u32_column(batch, "end_line")?;
            let distance = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| VectorDbError::Integrity("missing _distance column".to_string()))?;

            for i in 0..batch.num_rows() {
                let metadata = match partition.value(i) {
                    "code" => {
                        if language.is_null(i)
                            || chunk_kind.is_null(i)
                            || start_line.is_null(i)
                            || end_line.is_null(i)
                        {
                            return Err(VectorDbError::Integrity(format!(
                                "code item for {} is missing fields",
                                origin.value(i)
                            ))
                            .into());
                        }
                        let kind: ChunkKind = chunk_kind
                            .value(i)
                            .parse()
                            .map_err(VectorDbError::Integrity)?;
                        ItemMetadata::Code(CodeMetadata {
                            text: text.value(i).to_string(),
                            file_path: origin.value(i).to_string(),
                            language: language.value(i).to_string(),
                            start_line: start_line.value(i) as usize,
                            end_line: end_line.value(i) as usize,
                            chunk_kind: kind,
                        })
                    }
                    "knowledge" => {
                        if section.is_null(i) {
                            return Err(VectorDbError::Integrity(format!(
                                "knowledge item for {} has no section",
                                origin.value(i)
                            ))
                            .into());
                        }
                        ItemMetadata::Knowledge(KnowledgeMetadata {
                            text: text.value(i).to_string(),
                            source: origin.value(i).to_string(),
                            section: section.value(i).to_string(),
                        })
                    }
                    other => {
                        return Err(
                            VectorDbError::Integrity(format!("unknown partition '{}'", other)).into(),
                        );
                    }
                };

                results.push(ScoredItem {
                    metadata,
                    score: 1.0 / (1.0 + distance.value(i)),
                });
            }
        }

        Ok(results)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| VectorDbError::Integrity(format!("missing or invalid {} column", name)).into())
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| VectorDbError::Integrity(format!("missing or invalid {} column", name)).into())
}

/// Quote a string literal for a LanceDB filter
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait::async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );

        if self.table_exists().await? {
            let table = self.get_table().await?;
            match Self::table_dimension(&table).await? {
                Some(existing) if existing != dimension => {
                    return Err(VectorDbError::Integrity(format!(
                        "index holds {}-dimensional vectors but the model produces {}; re-train with --full",
                        existing, dimension
                    ))
                    .into());
                }
                _ => {
                    tracing::debug!("Table '{}' already exists", self.table_name);
                    return Ok(());
                }
            }
        }

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());

        // Need to wrap in iterator that returns Result<RecordBatch>
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorDbError::TableCreationFailed {
                table: self.table_name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    async fn begin_update(&self) -> Result<()> {
        Ok(self.update.begin()?)
    }

    async fn insert(&self, vector: Vec<f32>, metadata: ItemMetadata) -> Result<()> {
        Ok(self.update.push(vector, metadata)?)
    }

    async fn end_update(&self) -> Result<usize> {
        let pending = self.update.take()?;
        if pending.is_empty() {
            return Ok(0);
        }

        let table = self.get_table().await?;
        let schema = table.schema().await.context("Failed to read table schema")?;
        let batch = Self::create_record_batch(pending, schema.clone())?;
        let count = batch.num_rows();

        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorDbError::StoreFailed(e.to_string()))?;

        tracing::debug!("Stored {} items", count);
        Ok(count)
    }

    async fn cancel_update(&self) -> Result<()> {
        let dropped = self.update.cancel()?;
        if dropped > 0 {
            tracing::debug!("Cancelled update with {} pending items", dropped);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<Partition>,
    ) -> Result<Vec<ScoredItem>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let table = self.get_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| VectorDbError::QueryFailed(e.to_string()))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let query = table
            .vector_search(vector.to_vec())
            .map_err(|e| VectorDbError::QueryFailed(e.to_string()))?
            .limit(k);

        let stream = match filter {
            Some(partition) => query
                .only_if(format!("partition = {}", sql_literal(partition.as_str())))
                .execute()
                .await,
            None => query.execute().await,
        }
        .map_err(|e| VectorDbError::QueryFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| VectorDbError::QueryFailed(e.to_string()))?;

        Self::decode_results(&batches)
    }

    async fn delete_by_path(&self, partition: Partition, path: &str) -> Result<()> {
        let table = self.get_table().await?;

        // LanceDB uses SQL-like delete
        let filter = format!(
            "partition = {} AND origin = {}",
            sql_literal(partition.as_str()),
            sql_literal(path)
        );

        table
            .delete(&filter)
            .await
            .map_err(|e| VectorDbError::DeleteFailed(e.to_string()))?;

        tracing::debug!("Deleted {} items for: {}", partition, path);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if !self.table_exists().await? {
            return Ok(());
        }

        // Drop the table (empty namespace array for default namespace);
        // the next initialize recreates it
        self.connection
            .drop_table(&self.table_name, &[])
            .await
            .map_err(|e| VectorDbError::DeleteFailed(e.to_string()))?;

        tracing::info!("Cleared all items from {}", self.db_path);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let table = self.get_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| VectorDbError::QueryFailed(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests;
