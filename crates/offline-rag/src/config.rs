//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ingestion::ChunkParams;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "OFFLINE_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Ingestion configuration
    pub ingest: IngestConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file. Missing sections keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: RagConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `OFFLINE_RAG_CONFIG` (if set) and `OFFLINE_RAG_*` overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OFFLINE_RAG_*` overrides from a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OFFLINE_RAG_DATA_DIR") {
            self.ingest.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OFFLINE_RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("OFFLINE_RAG_PORT") {
            self.server.port = parse_override("OFFLINE_RAG_PORT", &v)?;
        }
        if let Some(v) = lookup("OFFLINE_RAG_QDRANT_URL") {
            self.vector_db.url = v;
        }
        if let Some(v) = lookup("OFFLINE_RAG_COLLECTION") {
            self.vector_db.collection = v;
        }
        if let Some(v) = lookup("OFFLINE_RAG_OLLAMA_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("OFFLINE_RAG_LLM_MODEL") {
            self.llm.generate_model = v;
        }
        if let Some(v) = lookup("OFFLINE_RAG_EMBED_BACKEND") {
            self.embeddings.backend = match v.to_lowercase().as_str() {
                "ollama" => EmbeddingBackend::Ollama,
                "onnx" => EmbeddingBackend::Onnx,
                "hash" => EmbeddingBackend::Hash,
                other => {
                    return Err(Error::config(format!("Unknown embedding backend: {}", other)))
                }
            };
        }
        if let Some(v) = lookup("OFFLINE_RAG_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_override("OFFLINE_RAG_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("OFFLINE_RAG_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_override("OFFLINE_RAG_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("OFFLINE_RAG_TOP_K") {
            self.retrieval.top_k = parse_override("OFFLINE_RAG_TOP_K", &v)?;
        }
        Ok(())
    }

    /// Check that both chunking profiles are usable
    pub fn validate(&self) -> Result<()> {
        self.chunking.directory_params()?;
        self.chunking.upload_params()?;
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be greater than 0"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("Invalid value for {}: {}", key, value)))
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which embedding implementation backs the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embeddings`
    #[default]
    Ollama,
    /// Local ONNX model (requires the `onnx` feature)
    Onnx,
    /// Deterministic hashing embedder, no model required
    Hash,
}

/// Pooling strategy for ONNX transformer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// First token ([CLS]) hidden state
    Cls,
    /// Attention-masked mean over all tokens
    #[default]
    Mean,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub backend: EmbeddingBackend,
    /// Model name (HuggingFace id for ONNX, Ollama tag for Ollama)
    pub model: String,
    /// Embedding dimensions (384 for bge-small-en-v1.5 and all-minilm)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Pooling used by the ONNX embedder
    pub pooling: Pooling,
    /// Local model directory checked before downloading
    pub model_dir: PathBuf,
    /// Cache directory for downloaded models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: "BAAI/bge-small-en-v1.5".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 512,
            pooling: Pooling::default(),
            model_dir: PathBuf::from("models").join("bge-small-en-v1.5"),
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("offline-rag")
                .join("models"),
        }
    }
}

/// Word-window chunking configuration.
///
/// Directory ingestion and upload ingestion each have their own profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window width in words for directory ingestion
    pub chunk_size: usize,
    /// Overlap in words for directory ingestion
    pub chunk_overlap: usize,
    /// Window width in words for uploads
    pub upload_chunk_size: usize,
    /// Overlap in words for uploads
    pub upload_chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 128,
            upload_chunk_size: 500,
            upload_chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// Validated parameters for directory ingestion
    pub fn directory_params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunk_size, self.chunk_overlap)
    }

    /// Validated parameters for uploads
    pub fn upload_params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.upload_chunk_size, self.upload_chunk_overlap)
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name (used when embeddings.backend = ollama).
    /// Its output width must equal `embeddings.dimensions`.
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub num_predict: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm".to_string(),
            generate_model: "mistral".to_string(),
            temperature: 0.2,
            num_predict: 128,
            timeout_secs: 120,
            max_retries: 1,
        }
    }
}

/// Vector database (Qdrant) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Use the in-process store instead of Qdrant
    pub in_memory: bool,
    /// Qdrant gRPC URL
    pub url: String,
    /// Collection name
    pub collection: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Points per upsert request
    pub upsert_batch_size: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            in_memory: false,
            url: "http://localhost:6334".to_string(),
            collection: "rag_chunks".to_string(),
            api_key: None,
            timeout_secs: 30,
            upsert_batch_size: 256,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory scanned for source files; uploads are saved here too
    pub data_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of context chunks passed to the LLM
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.chunking.chunk_overlap, 128);
        assert_eq!(config.chunking.upload_chunk_size, 500);
        assert_eq!(config.chunking.upload_chunk_overlap, 50);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.llm.embed_model, "all-minilm");
        assert_eq!(config.embeddings.pooling, Pooling::Mean);
        assert_eq!(config.vector_db.collection, "rag_chunks");
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 64
            chunk_overlap = 16

            [vector_db]
            in_memory = true
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 64);
        assert_eq!(config.chunking.chunk_overlap, 16);
        // untouched fields keep defaults
        assert_eq!(config.chunking.upload_chunk_size, 500);
        assert!(config.vector_db.in_memory);
        assert_eq!(config.llm.generate_model, "mistral");
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let err = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 100
            chunk_overlap = 100
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OFFLINE_RAG_DATA_DIR", "/srv/docs"),
            ("OFFLINE_RAG_CHUNK_SIZE", "200"),
            ("OFFLINE_RAG_CHUNK_OVERLAP", "20"),
            ("OFFLINE_RAG_EMBED_BACKEND", "hash"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.ingest.data_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.chunking.chunk_size, 200);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Hash);
    }

    #[test]
    fn test_bad_override_value() {
        let mut config = RagConfig::default();
        let err = config
            .apply_overrides(|k| (k == "OFFLINE_RAG_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
