//! Embedding + index gateway: full rebuilds and similarity search

use std::sync::Arc;

use crate::embeddings::l2_normalize;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorSearchResult, VectorStoreProvider};
use crate::timer::Timer;
use crate::types::ChunkRecord;

/// Pairs an embedder with a vector store.
///
/// Every vector is unit-normalized before it reaches the store, at index
/// time and at query time alike.
pub struct IndexGateway {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl IndexGateway {
    /// Create a gateway
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self { embedder, store }
    }

    /// Embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Vector store provider
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Replace the entire index with `chunks`.
    ///
    /// Chunks are embedded and checked before the index is dropped, so an
    /// embedding failure leaves the previous index in place. A store failure
    /// after the drop leaves the index partially rebuilt; the error is
    /// returned and the caller must ingest again.
    pub async fn index_all(&self, chunks: &[ChunkRecord]) -> Result<usize> {
        let _timer = Timer::start("index_all");

        let texts: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
        let mut vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} vectors for {} chunks",
                self.embedder.name(),
                vectors.len(),
                chunks.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        for vector in &mut vectors {
            if vector.len() != dimensions {
                return Err(Error::embedding(format!(
                    "{} returned a {}-dimensional vector, expected {}",
                    self.embedder.name(),
                    vector.len(),
                    dimensions
                )));
            }
            l2_normalize(vector);
        }

        self.store.recreate(dimensions).await?;
        if let Err(e) = self.store.upsert(chunks, &vectors).await {
            tracing::error!(
                "Upsert into {} failed after the index was dropped; index is incomplete until the next ingestion: {}",
                self.store.name(),
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Indexed {} chunk(s) into {} using {} embeddings",
            chunks.len(),
            self.store.name(),
            self.embedder.name()
        );

        Ok(chunks.len())
    }

    /// Top `top_k` chunks for `query`, best first, with scores
    pub async fn try_search(&self, query: &str, top_k: usize) -> Result<Vec<VectorSearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut vector = self.embedder.embed(query).await?;
        l2_normalize(&mut vector);

        let results = self.store.search(&vector, top_k).await?;
        tracing::debug!("Retrieved {} chunk(s) for query", results.len());
        Ok(results)
    }

    /// Top `top_k` chunks for `query`, best first.
    ///
    /// Backend failures are logged and yield an empty list.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<ChunkRecord> {
        match self.try_search(query, top_k).await {
            Ok(results) => results.into_iter().map(|r| r.chunk).collect(),
            Err(e) if e.is_backend() => {
                tracing::warn!("Search backend unavailable, continuing without context: {}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Search failed, continuing without context: {}", e);
                Vec::new()
            }
        }
    }

    /// Number of indexed chunks
    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

}
