//! Qdrant-backed vector store

use async_trait::async_trait;
use qdrant_client::config::QdrantConfig;
use qdrant_client::qdrant::{
    value::Kind, vectors_config::Config as VectorsConfigKind,
    with_payload_selector::SelectorOptions, CollectionExistsRequest, CountPoints,
    CreateCollection, DeleteCollection, Distance, PointStruct, SearchPoints, UpsertPoints, Value,
    VectorParams, VectorsConfig, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use serde_json::{Map, Number};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::{VectorSearchResult, VectorStoreProvider};
use crate::types::ChunkRecord;

/// Vector store over one Qdrant collection; point id = `chunk_id`
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    upsert_batch_size: usize,
}

impl QdrantStore {
    /// Build a client for the configured gRPC endpoint.
    ///
    /// Does not contact the server; use `health_check` for that.
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        tracing::info!(
            "Using Qdrant at {} (collection '{}')",
            config.url,
            config.collection
        );

        let mut qdrant_config = QdrantConfig::from_url(&config.url);
        qdrant_config.check_compatibility = false;
        qdrant_config.timeout = Duration::from_secs(config.timeout_secs);
        qdrant_config.connect_timeout = Duration::from_secs(10);
        if let Some(api_key) = &config.api_key {
            qdrant_config.api_key = Some(api_key.clone());
        }

        Ok(Self {
            client: Qdrant::new(qdrant_config)?,
            collection: config.collection.clone(),
            upsert_batch_size: config.upsert_batch_size.max(1),
        })
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn recreate(&self, dimensions: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(CollectionExistsRequest {
                collection_name: self.collection.clone(),
            })
            .await?;

        if exists {
            tracing::info!("Dropping collection '{}'", self.collection);
            self.client
                .delete_collection(DeleteCollection {
                    collection_name: self.collection.clone(),
                    ..Default::default()
                })
                .await?;
        }

        let vectors_config = VectorsConfig {
            config: Some(VectorsConfigKind::Params(VectorParams {
                size: dimensions as u64,
                distance: Distance::Cosine.into(),
                ..Default::default()
            })),
        };

        self.client
            .create_collection(CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(vectors_config),
                ..Default::default()
            })
            .await?;

        tracing::info!(
            "Created collection '{}' ({} dimensions, cosine)",
            self.collection,
            dimensions
        );
        Ok(())
    }

    async fn upsert(&self, chunks: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::vector_db(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let payload: HashMap<String, Value> = match chunk.to_payload() {
                    serde_json::Value::Object(map) => {
                        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
                    }
                    _ => HashMap::new(),
                };
                PointStruct::new(chunk.chunk_id, vector.clone(), payload)
            })
            .collect();

        for batch in points.chunks(self.upsert_batch_size) {
            self.client
                .upsert_points(UpsertPoints {
                    collection_name: self.collection.clone(),
                    wait: Some(true),
                    points: batch.to_vec(),
                    ..Default::default()
                })
                .await?;
            tracing::debug!("Upserted {} point(s) into '{}'", batch.len(), self.collection);
        }

        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let response = self
            .client
            .search_points(SearchPoints {
                collection_name: self.collection.clone(),
                vector: query.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let payload = payload_to_json(point.payload);
            match ChunkRecord::from_payload(&payload) {
                Ok(chunk) => results.push(VectorSearchResult {
                    chunk,
                    similarity: point.score,
                }),
                Err(e) => tracing::warn!("Skipping point with unusable payload: {}", e),
            }
        }

        Ok(results)
    }

    async fn len(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPoints {
                collection_name: self.collection.clone(),
                exact: Some(true),
                ..Default::default()
            })
            .await?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

fn payload_to_json(payload: HashMap<String, Value>) -> Map<String, serde_json::Value> {
    payload
        .into_iter()
        .map(|(k, v)| (k, value_to_json(v)))
        .collect()
}

/// Scalar payload values only; the chunk schema has no nested fields
fn value_to_json(value: Value) -> serde_json::Value {
    match value.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        _ => serde_json::Value::Null,
    }
}
