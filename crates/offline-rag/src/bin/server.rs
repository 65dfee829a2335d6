//! RAG Server binary
//!
//! Run with: cargo run -p offline-rag --bin offline-rag-server

use offline_rag::{config::RagConfig, server::RagServer, RagService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Data directory: {}", config.ingest.data_dir.display());
    tracing::info!(
        "  - Embeddings: {:?} ({}, {} dims)",
        config.embeddings.backend,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Vector store: {}",
        if config.vector_db.in_memory {
            "in-memory".to_string()
        } else {
            format!("{} ({})", config.vector_db.url, config.vector_db.collection)
        }
    );
    tracing::info!(
        "  - Chunking: {}/{} (directory), {}/{} (upload)",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.chunking.upload_chunk_size,
        config.chunking.upload_chunk_overlap
    );

    let service = RagService::from_config(config).await?;

    let health = service.health().await;
    if !health.llm {
        tracing::warn!("Ollama is not reachable; answers will use the fallback message");
        tracing::warn!("  Start it with: ollama serve");
    }
    if !health.vector_store {
        tracing::warn!("Vector store is not reachable; searches will return no context");
    }

    let server = RagServer::from_service(service);

    println!("\nServer starting...");
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest            - Upload documents");
    println!("  POST /api/ingest/directory  - Re-index the data directory");
    println!("  POST /api/chunk             - Chunk records without indexing");
    println!("  POST /api/query             - Ask questions");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
