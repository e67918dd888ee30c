//! Partition-aware retrieval over a [`VectorIndex`]
//!
//! In `both` mode the code partition gets the full `top_k` budget and the
//! knowledge partition half of it (rounded up); the two lists are merged by
//! score and cut back to `top_k`.

use crate::types::{Partition, PartitionMode, RetrievedContext};
use crate::vector_db::VectorIndex;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Ranked contexts for an already-embedded query, highest score first
    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        top_k: usize,
        mode: PartitionMode,
    ) -> Result<Vec<RetrievedContext>> {
        match mode {
            PartitionMode::Code => self.query_partition(query_vector, top_k, Partition::Code).await,
            PartitionMode::Knowledge => {
                self.query_partition(query_vector, top_k, Partition::Knowledge)
                    .await
            }
            PartitionMode::Both => {
                let code = self
                    .query_partition(query_vector, top_k, Partition::Code)
                    .await?;
                let knowledge = self
                    .query_partition(query_vector, top_k.div_ceil(2), Partition::Knowledge)
                    .await?;
                tracing::debug!(
                    "Merging {} code and {} knowledge results",
                    code.len(),
                    knowledge.len()
                );
                Ok(merge(code, knowledge, top_k))
            }
        }
    }

    async fn query_partition(
        &self,
        query_vector: &[f32],
        k: usize,
        partition: Partition,
    ) -> Result<Vec<RetrievedContext>> {
        let items = self.index.query(query_vector, k, Some(partition)).await?;
        Ok(items.into_iter().map(RetrievedContext::from).collect())
    }
}

/// Concatenate, sort by descending score and keep the best `top_k`
///
/// Equal scores keep their concatenation order, so code wins ties.
pub fn merge(
    code: Vec<RetrievedContext>,
    knowledge: Vec<RetrievedContext>,
    top_k: usize,
) -> Vec<RetrievedContext> {
    let mut merged = code;
    merged.extend(knowledge);
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_k);
    merged
}

/// Cluster contexts by file (knowledge by source document)
///
/// Groups appear in the order their first member appears in the input.
/// Within a group, code chunks are ordered by start line; knowledge sections
/// keep their relative order.
pub fn group_by_file(contexts: Vec<RetrievedContext>) -> Vec<RetrievedContext> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<RetrievedContext>> = HashMap::new();

    for context in contexts {
        let key = context.metadata.origin().to_string();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(context);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .flat_map(|mut group| {
            group.sort_by_key(|c| c.metadata.start_line().unwrap_or(0));
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkKind, CodeMetadata, ItemMetadata, KnowledgeMetadata, ScoredItem};

    /// Index that returns canned results per partition
    struct FixedIndex {
        code: Vec<ScoredItem>,
        knowledge: Vec<ScoredItem>,
    }

    #[async_trait::async_trait]
    impl VectorIndex for FixedIndex {
        async fn initialize(&self, _dimension: usize) -> Result<()> {
            Ok(())
        }

        async fn begin_update(&self) -> Result<()> {
            Ok(())
        }

        async fn insert(&self, _vector: Vec<f32>, _metadata: ItemMetadata) -> Result<()> {
            Ok(())
        }

        async fn end_update(&self) -> Result<usize> {
            Ok(0)
        }

        async fn cancel_update(&self) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            k: usize,
            filter: Option<Partition>,
        ) -> Result<Vec<ScoredItem>> {
            let source = match filter {
                Some(Partition::Code) => self.code.clone(),
                Some(Partition::Knowledge) => self.knowledge.clone(),
                None => self.code.iter().chain(&self.knowledge).cloned().collect(),
            };
            Ok(source.into_iter().take(k).collect())
        }

        async fn delete_by_path(&self, _partition: Partition, _path: &str) -> Result<()> {
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.code.len() + self.knowledge.len())
        }
    }

    fn code_item(file: &str, start_line: usize, score: f32) -> ScoredItem {
        ScoredItem {
            metadata: ItemMetadata::Code(CodeMetadata {
                text: format!("{}:{}", file, start_line),
                file_path: file.to_string(),
                language: "typescript".to_string(),
                start_line,
                end_line: start_line + 39,
                chunk_kind: ChunkKind::General,
            }),
            score,
        }
    }

    fn knowledge_item(source: &str, section: &str, score: f32) -> ScoredItem {
        ScoredItem {
            metadata: ItemMetadata::Knowledge(KnowledgeMetadata {
                text: section.to_string(),
                source: source.to_string(),
                section: section.to_string(),
            }),
            score,
        }
    }

    fn context(item: ScoredItem) -> RetrievedContext {
        RetrievedContext::from(item)
    }

    fn scenario_index() -> FixedIndex {
        FixedIndex {
            code: [0.9, 0.8, 0.7, 0.6, 0.5, 0.4]
                .iter()
                .enumerate()
                .map(|(i, s)| code_item(&format!("/src/f{}.ts", i), 1, *s))
                .collect(),
            knowledge: [0.95, 0.3, 0.2]
                .iter()
                .enumerate()
                .map(|(i, s)| knowledge_item("/docs/guide.md", &format!("S{}", i), *s))
                .collect(),
        }
    }

    fn scores(contexts: &[RetrievedContext]) -> Vec<f32> {
        contexts.iter().map(|c| c.score).collect()
    }

    #[tokio::test]
    async fn test_both_mode_merges_and_truncates() {
        let retriever = Retriever::new(Arc::new(scenario_index()));
        let results = retriever
            .retrieve(&[0.0; 4], 6, PartitionMode::Both)
            .await
            .unwrap();
        assert_eq!(scores(&results), vec![0.95, 0.9, 0.8, 0.7, 0.6, 0.5]);
        assert_eq!(results[0].metadata.partition(), Partition::Knowledge);
    }

    #[tokio::test]
    async fn test_both_mode_bounded_and_sorted() {
        let retriever = Retriever::new(Arc::new(scenario_index()));
        for k in 0..10 {
            let results = retriever
                .retrieve(&[0.0; 4], k, PartitionMode::Both)
                .await
                .unwrap();
            assert!(results.len() <= k);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_single_partition_modes() {
        let retriever = Retriever::new(Arc::new(scenario_index()));

        let code = retriever
            .retrieve(&[0.0; 4], 3, PartitionMode::Code)
            .await
            .unwrap();
        assert_eq!(scores(&code), vec![0.9, 0.8, 0.7]);
        assert!(code.iter().all(|c| c.metadata.partition() == Partition::Code));

        let knowledge = retriever
            .retrieve(&[0.0; 4], 5, PartitionMode::Knowledge)
            .await
            .unwrap();
        assert_eq!(scores(&knowledge), vec![0.95, 0.3, 0.2]);
    }

    #[test]
    fn test_merge_ties_prefer_code() {
        let merged = merge(
            vec![context(code_item("/a.ts", 1, 0.5))],
            vec![context(knowledge_item("/k.md", "K", 0.5))],
            1,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].metadata.partition(), Partition::Code);
    }

    #[test]
    fn test_group_by_file_orders_groups_and_lines() {
        let input = vec![
            context(code_item("/a.ts", 71, 0.9)),
            context(code_item("/b.ts", 1, 0.8)),
            context(code_item("/a.ts", 1, 0.7)),
            context(knowledge_item("/guide.md", "Setup", 0.6)),
            context(code_item("/b.ts", 36, 0.5)),
            context(code_item("/a.ts", 36, 0.4)),
            context(knowledge_item("/guide.md", "Usage", 0.3)),
        ];

        let grouped = group_by_file(input);
        let layout: Vec<(String, Option<usize>)> = grouped
            .iter()
            .map(|c| (c.metadata.origin().to_string(), c.metadata.start_line()))
            .collect();

        assert_eq!(
            layout,
            vec![
                ("/a.ts".to_string(), Some(1)),
                ("/a.ts".to_string(), Some(36)),
                ("/a.ts".to_string(), Some(71)),
                ("/b.ts".to_string(), Some(1)),
                ("/b.ts".to_string(), Some(36)),
                ("/guide.md".to_string(), None),
                ("/guide.md".to_string(), None),
            ]
        );
        assert_eq!(grouped[5].text, "Setup");
        assert_eq!(grouped[6].text, "Usage");
    }

    #[test]
    fn test_group_by_file_empty() {
        assert!(group_by_file(Vec::new()).is_empty());
    }
}
