//! Document ingestion endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::service::UploadedFile;
use crate::types::{IngestOptions, IngestResponse};

/// POST /api/ingest - Upload files, then rebuild the index from the data directory
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut options = IngestOptions::default();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "options" {
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::invalid_request(format!("Failed to read options: {}", e)))?;
            options = serde_json::from_slice(&data)
                .map_err(|e| Error::invalid_request(format!("Invalid options: {}", e)))?;
            continue;
        }

        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring non-file field '{}'", name);
            continue;
        };

        let data = field.bytes().await.map_err(|e| {
            Error::invalid_request(format!("Failed to read file '{}': {}", filename, e))
        })?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        files.push(UploadedFile { filename, data });
    }

    Ok(Json(state.service().ingest_uploads(files, &options).await?))
}

/// POST /api/ingest/directory - Rebuild the index from the data directory
pub async fn ingest_directory(
    State(state): State<AppState>,
    options: Option<Json<IngestOptions>>,
) -> Result<Json<IngestResponse>> {
    let options = options.map(|Json(o)| o).unwrap_or_default();
    Ok(Json(state.service().ingest_directory(&options).await?))
}
