//! Document ingestion: file loading and word-window chunking

mod chunker;
mod loader;
mod pipeline;

pub use chunker::{chunk_documents, ChunkIdCounter, ChunkParams, Chunker};
pub use loader::{FileLoader, LoadReport};
pub use pipeline::{IngestBatch, IngestPipeline};
