//! offline-rag: Offline document Q&A with page and paragraph citations
//!
//! PDF, DOCX and TXT files are loaded into document records, split into
//! overlapping word windows that remember where they came from, embedded
//! into a vector index (Qdrant or in-process), and used as context for an
//! Ollama-served model. Every answer carries the provenance of the chunks
//! it was grounded on.
//!
//! The chunker is usable on its own:
//!
//! ```
//! use offline_rag::{chunk_documents, DocumentRecord};
//!
//! let records = vec![DocumentRecord::flowing(
//!     "notes.docx",
//!     ["alpha beta gamma", "delta epsilon"],
//! )];
//! let chunks = chunk_documents(&records, 5, 2).unwrap();
//!
//! assert_eq!(chunks[0].source_ref.as_deref(), Some("Paragraphs: 1-2"));
//! assert_eq!(chunks[1].chunk_text, "delta epsilon");
//! ```

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod timer;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{chunk_documents, ChunkIdCounter, ChunkParams, Chunker};
pub use service::RagService;
pub use types::{Answer, ChunkRecord, Citation, DocumentRecord, FileType, QueryRequest, QueryResponse};
