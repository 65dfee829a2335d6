//! Core types for the RAG pipeline

pub mod chunk;
pub mod document;
pub mod query;
pub mod response;

pub use chunk::ChunkRecord;
pub use document::{DocumentRecord, FileType, RawDocumentRecord};
pub use query::{ChunkRequest, IngestOptions, QueryRequest};
pub use response::{Answer, ChunkResponse, Citation, IngestResponse, IngestWarning, QueryResponse};
