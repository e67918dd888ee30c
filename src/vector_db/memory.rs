//! In-memory [`VectorIndex`] for tests and ephemeral sessions
//!
//! Items live in a `Vec` behind `std::sync::RwLock`; queries are brute-force
//! cosine similarity over every stored vector.

use super::{UpdateBuffer, VectorIndex};
use crate::error::VectorDbError;
use crate::types::{ItemMetadata, Partition, ScoredItem};
use anyhow::Result;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct StoredItem {
    vector: Vec<f32>,
    metadata: ItemMetadata,
}

#[derive(Default)]
pub struct InMemoryVectorIndex {
    items: RwLock<Vec<StoredItem>>,
    dimension: RwLock<Option<usize>>,
    update: UpdateBuffer,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_items(&self) -> Result<RwLockReadGuard<'_, Vec<StoredItem>>, VectorDbError> {
        self.items
            .read()
            .map_err(|e| VectorDbError::QueryFailed(format!("index lock poisoned: {}", e)))
    }

    fn write_items(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredItem>>, VectorDbError> {
        self.items
            .write()
            .map_err(|e| VectorDbError::StoreFailed(format!("index lock poisoned: {}", e)))
    }

    fn dimension(&self) -> Result<Option<usize>, VectorDbError> {
        self.dimension
            .read()
            .map(|d| *d)
            .map_err(|e| VectorDbError::QueryFailed(format!("index lock poisoned: {}", e)))
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        let mut current = self
            .dimension
            .write()
            .map_err(|e| VectorDbError::StoreFailed(format!("index lock poisoned: {}", e)))?;
        match *current {
            Some(existing) if existing != dimension => Err(VectorDbError::Integrity(format!(
                "index holds {}-dimensional vectors, got {}",
                existing, dimension
            ))
            .into()),
            _ => {
                *current = Some(dimension);
                Ok(())
            }
        }
    }

    async fn begin_update(&self) -> Result<()> {
        Ok(self.update.begin()?)
    }

    async fn insert(&self, vector: Vec<f32>, metadata: ItemMetadata) -> Result<()> {
        let dimension = self.dimension()?.ok_or(VectorDbError::NotInitialized)?;
        if vector.len() != dimension {
            return Err(VectorDbError::StoreFailed(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                dimension
            ))
            .into());
        }
        Ok(self.update.push(vector, metadata)?)
    }

    async fn end_update(&self) -> Result<usize> {
        let pending = self.update.take()?;
        let count = pending.len();
        let mut items = self.write_items()?;
        items.extend(
            pending
                .into_iter()
                .map(|(vector, metadata)| StoredItem { vector, metadata }),
        );
        tracing::debug!("Committed {} items ({} total)", count, items.len());
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
        let items = self.read_items()?;
        let mut scored: Vec<ScoredItem> = items
            .iter()
            .filter(|item| filter.is_none_or(|p| item.metadata.partition() == p))
            .map(|item| ScoredItem {
                metadata: item.metadata.clone(),
                score: cosine_sim(vector, &item.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete_by_path(&self, partition: Partition, path: &str) -> Result<()> {
        let mut items = self.write_items()?;
        let before = items.len();
        items.retain(|item| !(item.metadata.partition() == partition && item.metadata.origin() == path));
        tracing::debug!("Deleted {} {} items for {}", before - items.len(), partition, path);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.write_items()?.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_items()?.len())
    }
}
