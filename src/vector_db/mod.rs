// LanceDB is the default embedded index; the in-memory index backs tests and ephemeral sessions
pub mod lance_client;
pub mod memory;

pub use lance_client::LanceVectorIndex;
pub use memory::InMemoryVectorIndex;

use crate::error::VectorDbError;
use crate::types::{ItemMetadata, Partition, ScoredItem};
use anyhow::Result;
use std::sync::Mutex;

/// Trait for vector index operations
///
/// Writes are transactional: `begin_update` opens an update, `insert` buffers
/// items into it and `end_update` commits them all at once. Readers never see
/// a partially written batch.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the underlying storage for vectors of this dimension if needed
    async fn initialize(&self, dimension: usize) -> Result<()>;

    async fn begin_update(&self) -> Result<()>;

    /// Buffer one item into the open update
    async fn insert(&self, vector: Vec<f32>, metadata: ItemMetadata) -> Result<()>;

    /// Commit the open update, returning the number of items written
    async fn end_update(&self) -> Result<usize>;

    /// Drop the open update without writing anything
    async fn cancel_update(&self) -> Result<()>;

    /// Nearest neighbours, highest score first, optionally restricted to one partition
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<Partition>,
    ) -> Result<Vec<ScoredItem>>;

    /// Remove every item of a partition whose file path (or source) equals `path`
    async fn delete_by_path(&self, partition: Partition, path: &str) -> Result<()>;

    /// Remove every item
    async fn clear(&self) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

/// Insert items inside one update, cancelling it if any insert fails
pub async fn write_batch(
    index: &dyn VectorIndex,
    items: Vec<(Vec<f32>, ItemMetadata)>,
) -> Result<usize> {
    if items.is_empty() {
        return Ok(0);
    }

    index.begin_update().await?;
    for (vector, metadata) in items {
        if let Err(e) = index.insert(vector, metadata).await {
            if let Err(cancel_err) = index.cancel_update().await {
                tracing::warn!("Failed to cancel update: {:#}", cancel_err);
            }
            return Err(e);
        }
    }
    index.end_update().await
}

/// Items buffered between `begin_update` and `end_update`
pub(crate) type PendingItems = Vec<(Vec<f32>, ItemMetadata)>;

/// Shared update bookkeeping for index implementations
#[derive(Default)]
pub(crate) struct UpdateBuffer {
    pending: Mutex<Option<PendingItems>>,
}

impl UpdateBuffer {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<PendingItems>>, VectorDbError> {
        self.pending
            .lock()
            .map_err(|e| VectorDbError::StoreFailed(format!("update lock poisoned: {}", e)))
    }

    pub(crate) fn begin(&self) -> Result<(), VectorDbError> {
        let mut pending = self.lock()?;
        if pending.is_some() {
            return Err(VectorDbError::UpdateInProgress);
        }
        *pending = Some(Vec::new());
        Ok(())
    }

    pub(crate) fn push(&self, vector: Vec<f32>, metadata: ItemMetadata) -> Result<(), VectorDbError> {
        match self.lock()?.as_mut() {
            Some(items) => {
                items.push((vector, metadata));
                Ok(())
            }
            None => Err(VectorDbError::NoActiveUpdate),
        }
    }

    /// Close the update and hand back its items
    pub(crate) fn take(&self) -> Result<PendingItems, VectorDbError> {
        self.lock()?.take().ok_or(VectorDbError::NoActiveUpdate)
    }

    pub(crate) fn cancel(&self) -> Result<usize, VectorDbError> {
        Ok(self.lock()?.take().map(|items| items.len()).unwrap_or(0))
    }
}
