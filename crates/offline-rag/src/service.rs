//! Ingestion and query orchestration shared by the server and the CLI

use bytes::Bytes;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::embeddings::HashEmbedder;
use crate::error::{Error, Result};
use crate::generation::{Generator, OllamaClient};
use crate::ingestion::{ChunkParams, Chunker, IngestBatch, IngestPipeline};
use crate::providers::{
    EmbeddingProvider, LlmProvider, OllamaEmbedder, OllamaLlm, VectorStoreProvider,
};
use crate::retrieval::{IndexGateway, MemoryStore, QdrantStore};
use crate::timer::Timer;
use crate::types::{
    ChunkRequest, ChunkResponse, DocumentRecord, FileType, IngestOptions, IngestResponse,
    IngestWarning, QueryRequest, QueryResponse,
};

/// A file received over the API
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename
    pub filename: String,
    /// File contents
    pub data: Bytes,
}

/// Reachability of each backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    pub embeddings: bool,
    pub vector_store: bool,
    pub llm: bool,
}

/// The RAG pipeline: load, chunk, index, retrieve, answer.
///
/// Rebuilds hold the index guard exclusively, so ingestions never overlap
/// and queries never see a half-built index.
pub struct RagService {
    config: RagConfig,
    index: IndexGateway,
    generator: Generator,
    guard: RwLock<()>,
}

impl RagService {
    /// Assemble a service from already-built components
    pub fn new(config: RagConfig, index: IndexGateway, generator: Generator) -> Self {
        Self {
            config,
            index,
            generator,
            guard: RwLock::new(()),
        }
    }

    /// Build the backends named in `config`
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let ollama = Arc::new(OllamaClient::new(&config.llm)?);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::from_client(
                Arc::clone(&ollama),
                config.embeddings.dimensions,
            )),
            EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)),
            #[cfg(feature = "onnx")]
            EmbeddingBackend::Onnx => {
                Arc::new(crate::embeddings::OnnxEmbedder::new(&config.embeddings).await?)
            }
            #[cfg(not(feature = "onnx"))]
            EmbeddingBackend::Onnx => {
                return Err(Error::config(
                    "embeddings.backend = \"onnx\" requires building with the onnx feature",
                ))
            }
        };

        let store: Arc<dyn VectorStoreProvider> = if config.vector_db.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(QdrantStore::new(&config.vector_db)?)
        };

        let llm = Arc::new(OllamaLlm::from_client(ollama));

        tracing::info!(
            "Pipeline ready: embeddings={}, store={}, llm={} ({})",
            embedder.name(),
            store.name(),
            llm.name(),
            llm.model()
        );

        let generator = Generator::new(llm, Duration::from_secs(config.llm.timeout_secs));
        Ok(Self::new(config, IndexGateway::new(embedder, store), generator))
    }

    /// Configuration in use
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Index gateway
    pub fn index(&self) -> &IndexGateway {
        &self.index
    }

    /// Rebuild the index from the data directory
    pub async fn ingest_directory(&self, options: &IngestOptions) -> Result<IngestResponse> {
        let params = resolve_params(self.config.chunking.directory_params()?, options)?;
        let timer = Timer::start("ingest_directory");

        let _guard = self.guard.write().await;
        let batch = self.rebuild(params).await?;

        Ok(ingest_response(batch, Vec::new(), timer.elapsed_ms()))
    }

    /// Save uploads into the data directory, then rebuild the index from the
    /// whole directory with the upload chunk profile
    pub async fn ingest_uploads(
        &self,
        files: Vec<UploadedFile>,
        options: &IngestOptions,
    ) -> Result<IngestResponse> {
        if files.is_empty() {
            return Err(Error::invalid_request("No files uploaded"));
        }

        let params = resolve_params(self.config.chunking.upload_params()?, options)?;
        let timer = Timer::start("ingest_uploads");

        let _guard = self.guard.write().await;

        let data_dir = &self.config.ingest.data_dir;
        tokio::fs::create_dir_all(data_dir).await?;

        let mut warnings = Vec::new();
        for file in &files {
            match save_upload(data_dir, file).await {
                Ok(name) => tracing::info!("Saved upload {} ({} bytes)", name, file.data.len()),
                Err(e) => {
                    tracing::warn!("Rejected upload {}: {}", file.filename, e);
                    warnings.push(IngestWarning {
                        filename: file.filename.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let batch = self.rebuild(params).await?;
        Ok(ingest_response(batch, warnings, timer.elapsed_ms()))
    }

    /// Answer a question from the indexed documents
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(Error::invalid_request("Question must not be empty"));
        }
        let top_k = request.top_k.unwrap_or(self.config.retrieval.top_k);

        tracing::info!("Query: \"{}\" (top_k={})", question, top_k);
        let timer = Timer::start("query");

        let _guard = self.guard.read().await;
        let chunks = self.index.search(question, top_k).await;
        let answer = self.generator.answer(question, &chunks).await;

        let response = QueryResponse::new(answer, timer.elapsed_ms());
        tracing::info!(
            "Query completed in {}ms, {} source(s){}",
            response.processing_time_ms,
            response.sources.len(),
            if response.fallback { ", fallback answer" } else { "" }
        );
        Ok(response)
    }

    /// Chunk records without touching the index
    pub fn chunk(request: ChunkRequest) -> Result<ChunkResponse> {
        let records = request
            .documents
            .into_iter()
            .map(DocumentRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        let chunks = Chunker::with_sizes(request.chunk_size, request.overlap)?.chunk(&records)?;
        Ok(ChunkResponse {
            total: chunks.len(),
            chunks,
        })
    }

    /// Check every backend
    pub async fn health(&self) -> BackendHealth {
        BackendHealth {
            embeddings: self.index.embedder().health_check().await.unwrap_or(false),
            vector_store: self.index.store().health_check().await.unwrap_or(false),
            llm: self.generator.llm().health_check().await.unwrap_or(false),
        }
    }

    /// Load and chunk off the async runtime, then replace the index.
    /// Callers hold the write guard.
    async fn rebuild(&self, params: ChunkParams) -> Result<IngestBatch> {
        let data_dir = self.config.ingest.data_dir.clone();
        let batch = tokio::task::spawn_blocking(move || {
            IngestPipeline::new(params).ingest_directory(&data_dir)
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        self.index.index_all(&batch.chunks).await?;
        Ok(batch)
    }
}

fn resolve_params(defaults: ChunkParams, options: &IngestOptions) -> Result<ChunkParams> {
    ChunkParams::new(
        options.chunk_size.unwrap_or(defaults.chunk_size()),
        options.chunk_overlap.unwrap_or(defaults.overlap()),
    )
}

/// Write an upload under its base name; anything but pdf/docx/txt is refused
async fn save_upload(data_dir: &Path, file: &UploadedFile) -> Result<String> {
    let name = Path::new(&file.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::invalid_request(format!("Invalid filename '{}'", file.filename)))?;

    if FileType::from_filename(name).is_none() {
        return Err(Error::UnsupportedFileType(name.to_string()));
    }

    tokio::fs::write(data_dir.join(name), &file.data).await?;
    Ok(name.to_string())
}

fn ingest_response(
    batch: IngestBatch,
    mut warnings: Vec<IngestWarning>,
    processing_time_ms: u64,
) -> IngestResponse {
    warnings.extend(batch.warnings);
    IngestResponse {
        success: true,
        files_loaded: batch.files_loaded,
        records_loaded: batch.records_loaded,
        total_chunks_created: batch.chunks.len(),
        processing_time_ms,
        warnings,
        ingested_at: chrono::Utc::now(),
    }
}
