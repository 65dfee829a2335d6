//! Provider abstractions for embeddings, vector storage and the LLM
//!
//! The index and generation gateways only talk to these traits, so the
//! Ollama/Qdrant backends can be swapped for in-process ones.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
