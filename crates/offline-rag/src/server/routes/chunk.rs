//! Chunk-only endpoint

use axum::Json;

use crate::error::Result;
use crate::service::RagService;
use crate::types::{ChunkRequest, ChunkResponse};

/// POST /api/chunk - Chunk document records without indexing them
pub async fn chunk_documents(Json(request): Json<ChunkRequest>) -> Result<Json<ChunkResponse>> {
    tracing::debug!(
        "Chunking {} record(s) (size={}, overlap={})",
        request.documents.len(),
        request.chunk_size,
        request.overlap
    );
    Ok(Json(RagService::chunk(request)?))
}
