//! Request types

use serde::{Deserialize, Serialize};

use super::document::RawDocumentRecord;

/// Question against the indexed documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (defaults to `retrieval.top_k`)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Per-request chunking overrides for ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Window width in words
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Overlap in words
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
}

/// Chunk a batch of records without indexing them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRequest {
    /// Records in processing order
    pub documents: Vec<RawDocumentRecord>,

    /// Window width in words
    pub chunk_size: usize,

    /// Overlap in words
    #[serde(default)]
    pub overlap: usize,
}
