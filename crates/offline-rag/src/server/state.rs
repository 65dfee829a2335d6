//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::service::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RagService>,
}

impl AppState {
    /// Wrap a service for sharing across handlers
    pub fn new(service: RagService) -> Self {
        Self {
            inner: Arc::new(service),
        }
    }

    /// Get the pipeline service
    pub fn service(&self) -> &RagService {
        &self.inner
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.config()
    }
}
