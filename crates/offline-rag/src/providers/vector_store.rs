//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ChunkRecord;

/// Search result from a vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: ChunkRecord,
    /// Cosine similarity, higher is more similar
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `QdrantStore`: Qdrant collection over gRPC
/// - `MemoryStore`: In-process brute-force index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Drop all stored points and start an empty index of `dimensions`
    async fn recreate(&self, dimensions: usize) -> Result<()>;

    /// Store chunks with their vectors, keyed by `chunk_id`
    async fn upsert(&self, chunks: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()>;

    /// Nearest chunks by cosine similarity, best first
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
