//! API routes for the RAG server

pub mod chunk;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ingest/directory", post(ingest::ingest_directory))
        .route("/chunk", post(chunk::chunk_documents))
        .route("/query", post(query::query_rag))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    let backends = state.service().health().await;
    let indexed_chunks = state.service().index().len().await.ok();

    Json(json!({
        "name": "offline-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Offline document Q&A with page and paragraph citations",
        "embedding_model": config.embeddings.model,
        "llm_model": config.llm.generate_model,
        "collection": config.vector_db.collection,
        "indexed_chunks": indexed_chunks,
        "backends": backends,
        "endpoints": {
            "POST /api/ingest": "Upload documents and rebuild the index",
            "POST /api/ingest/directory": "Rebuild the index from the data directory",
            "POST /api/chunk": "Chunk document records without indexing",
            "POST /api/query": "Ask a question, answer with citations"
        }
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::generation::ScriptedLlm;
    use crate::server::RagServer;
    use crate::service::tests::test_service;

    fn app(dir: &std::path::Path) -> Router {
        RagServer::from_service(test_service(dir, ScriptedLlm::replying("From the notes.")))
            .build_router()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chunk_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "documents": [
                {"kind": "flowing", "filename": "n.docx", "paragraphs": ["a b c", "d e f g"]}
            ],
            "chunk_size": 5,
            "overlap": 2
        });

        let (status, body) = send(app(dir.path()), post_json("/api/chunk", body)).await;

        assert_eq!(status, StatusCode::OK);
        // 7 words, stride 3: starts 0, 3, 6
        assert_eq!(body["total"], 3);
        assert_eq!(body["chunks"][0]["source_ref"], "Paragraphs: 1-2");
        assert_eq!(body["chunks"][1]["source_ref"], "Paragraph: 2");
        assert_eq!(body["chunks"][2]["chunk_text"], "g");
        assert!(body["chunks"][0]["page"].is_null());
    }

    #[tokio::test]
    async fn test_chunk_endpoint_rejects_bad_params() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "documents": [{"kind": "paged", "filename": "a.pdf", "text": "x", "page": 1, "total_pages": 1}],
            "chunk_size": 2,
            "overlap": 2
        });

        let (status, body) = send(app(dir.path()), post_json("/api/chunk", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "config_error");
    }

    #[tokio::test]
    async fn test_ingest_directory_then_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Meeting moved to Thursday.").unwrap();
        let app = app(dir.path());

        let (status, body) = send(
            app.clone(),
            post_json("/api/ingest/directory", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files_loaded"], 1);

        let (status, body) = send(
            app,
            post_json("/api/query", json!({"question": "When is the meeting?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "From the notes.");
        assert_eq!(body["sources"][0]["filename"], "notes.txt");
        assert_eq!(body["fallback"], false);
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"options\"\r\n\r\n{{\"chunk_size\": 2, \"chunk_overlap\": 0}}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"up.txt\"\r\nContent-Type: text/plain\r\n\r\none two three four\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/api/ingest")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(app(dir.path()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_chunks_created"], 2);
        assert!(dir.path().join("up.txt").exists());
    }
}
