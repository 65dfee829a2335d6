//! Response types for queries and ingestion

use serde::{Deserialize, Serialize};

use super::chunk::ChunkRecord;

/// Provenance of one context chunk, echoed back with an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source filename
    pub filename: String,
    /// Page number (paged sources only)
    pub page: Option<u32>,
    /// Page count (paged sources only)
    pub total_pages: Option<u32>,
    /// Chunk ID within the indexed batch
    pub chunk_id: u64,
    /// Human-readable provenance
    pub source_ref: Option<String>,
}

impl Citation {
    /// Create a citation from a chunk
    pub fn from_chunk(chunk: &ChunkRecord) -> Self {
        Self {
            filename: chunk.filename.clone(),
            page: chunk.page,
            total_pages: chunk.total_pages,
            chunk_id: chunk.chunk_id,
            source_ref: chunk.source_ref.clone(),
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        let location = match (&self.source_ref, self.page) {
            (Some(source_ref), _) => source_ref.clone(),
            (None, Some(page)) => format!("Page: {}", page),
            (None, None) => "unknown location".to_string(),
        };

        format!("[{} | {}, Chunk: {}]", self.filename, location, self.chunk_id)
    }
}

/// Output of the generation gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text (or the fallback message)
    pub text: String,
    /// Provenance of every context chunk, in context order
    pub sources: Vec<Citation>,
    /// True when the backend could not be reached and `text` is the fallback
    #[serde(default)]
    pub fallback: bool,
}

/// Response from a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Citations for the chunks the answer was grounded on
    pub sources: Vec<Citation>,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Whether the answer is the fallback message
    pub fallback: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Build a response from a generated answer
    pub fn new(answer: Answer, processing_time_ms: u64) -> Self {
        Self {
            chunks_retrieved: answer.sources.len(),
            answer: answer.text,
            sources: answer.sources,
            fallback: answer.fallback,
            processing_time_ms,
        }
    }
}

/// Response from ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether the index now holds the loaded corpus
    pub success: bool,
    /// Files that produced at least one record
    pub files_loaded: usize,
    /// Document records loaded (pages + flowing documents)
    pub records_loaded: usize,
    /// Chunks indexed
    pub total_chunks_created: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Files skipped during loading
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<IngestWarning>,
    /// Completion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

/// A file that was skipped during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestWarning {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Response for the chunk-only endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResponse {
    /// Total chunks
    pub total: usize,
    /// Chunks in emission order
    pub chunks: Vec<ChunkRecord>,
}
