//! Chunk records: the unit that is embedded, indexed and cited

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// A window of consecutive words from one document record, with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Window words joined by single spaces
    pub chunk_text: String,
    /// Source filename
    pub filename: String,
    /// Position in the batch this chunk was produced in
    pub chunk_id: u64,
    /// Human-readable provenance ("Page: 5", "Paragraph: 3", "Paragraphs: 2-4").
    ///
    /// Always set by the chunker; may be missing on records rebuilt from an
    /// index that did not store it.
    pub source_ref: Option<String>,
    /// Page number for paged sources
    pub page: Option<u32>,
    /// Page count for paged sources
    pub total_pages: Option<u32>,
}

impl ChunkRecord {
    /// Index payload for this chunk
    pub fn to_payload(&self) -> Value {
        json!({
            "filename": self.filename,
            "page": self.page,
            "total_pages": self.total_pages,
            "chunk_id": self.chunk_id,
            "chunk_text": self.chunk_text,
            "source_ref": self.source_ref,
        })
    }

    /// Rebuild a chunk from a stored payload.
    ///
    /// `chunk_text`, `filename` and `chunk_id` are required; the provenance
    /// fields fall back to `None`.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self> {
        let chunk_text = payload
            .get("chunk_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::vector_db("payload missing 'chunk_text'"))?
            .to_string();

        let filename = payload
            .get("filename")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::vector_db("payload missing 'filename'"))?
            .to_string();

        let chunk_id = payload
            .get("chunk_id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::vector_db("payload missing 'chunk_id'"))?;

        let source_ref = payload
            .get("source_ref")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let page = payload
            .get("page")
            .and_then(|v| v.as_u64())
            .map(|p| p as u32);

        let total_pages = payload
            .get("total_pages")
            .and_then(|v| v.as_u64())
            .map(|p| p as u32);

        Ok(Self {
            chunk_text,
            filename,
            chunk_id,
            source_ref,
            page,
            total_pages,
        })
    }
}
