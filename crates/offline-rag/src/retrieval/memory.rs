//! In-process vector store with brute-force cosine search

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::embeddings::cosine_similarity;
use crate::error::{Error, Result};
use crate::providers::{VectorSearchResult, VectorStoreProvider};
use crate::types::ChunkRecord;

#[derive(Default)]
struct Index {
    dimensions: usize,
    points: BTreeMap<u64, (ChunkRecord, Vec<f32>)>,
}

/// Vector store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    index: RwLock<Index>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryStore {
    async fn recreate(&self, dimensions: usize) -> Result<()> {
        let mut index = self.index.write();
        index.points.clear();
        index.dimensions = dimensions;
        Ok(())
    }

    async fn upsert(&self, chunks: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::vector_db(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut index = self.index.write();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if vector.len() != index.dimensions {
                return Err(Error::vector_db(format!(
                    "vector for chunk {} has {} dimensions, index expects {}",
                    chunk.chunk_id,
                    vector.len(),
                    index.dimensions
                )));
            }
            index
                .points
                .insert(chunk.chunk_id, (chunk.clone(), vector.clone()));
        }
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let index = self.index.read();

        let mut results: Vec<VectorSearchResult> = index
            .points
            .values()
            .map(|(chunk, vector)| VectorSearchResult {
                chunk: chunk.clone(),
                similarity: cosine_similarity(query, vector),
            })
            .collect();

        // stable sort keeps chunk_id order among ties
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);
        Ok(results)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.index.read().points.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_text: format!("chunk {}", id),
            filename: "a.txt".into(),
            chunk_id: id,
            source_ref: Some("Paragraph: 1".into()),
            page: None,
            total_pages: None,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = MemoryStore::new();
        store.recreate(2).await.unwrap();
        store
            .upsert(
                &[chunk(0), chunk(1), chunk(2)],
                &[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<u64> = results.iter().map(|r| r.chunk.chunk_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(results[0].similarity > results[1].similarity);
    }

    #[tokio::test]
    async fn test_recreate_clears() {
        let store = MemoryStore::new();
        store.recreate(1).await.unwrap();
        store.upsert(&[chunk(0)], &[vec![1.0]]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);

        store.recreate(1).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = MemoryStore::new();
        store.recreate(3).await.unwrap();
        let err = store.upsert(&[chunk(0)], &[vec![1.0]]).await.unwrap_err();
        assert!(matches!(err, Error::VectorDb(_)));
    }
}
