//! Ingestion pipeline orchestration

use std::path::Path;

use crate::error::Result;
use crate::types::{ChunkRecord, IngestWarning};

use super::chunker::{ChunkParams, Chunker};
use super::loader::{FileLoader, LoadReport};

/// Chunks produced from one load, with the load's bookkeeping
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    /// Chunks in emission order, IDs starting at 0
    pub chunks: Vec<ChunkRecord>,
    /// Files that produced at least one record
    pub files_loaded: usize,
    /// Records loaded (pages + flowing documents)
    pub records_loaded: usize,
    /// Files that were skipped
    pub warnings: Vec<IngestWarning>,
}

/// Main ingestion pipeline: load, then chunk
pub struct IngestPipeline {
    chunker: Chunker,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(params: ChunkParams) -> Self {
        Self {
            chunker: Chunker::new(params),
        }
    }

    /// Load and chunk every supported file in `dir`
    pub fn ingest_directory(&self, dir: &Path) -> Result<IngestBatch> {
        let report = FileLoader::load_directory(dir)?;
        self.chunk_report(report)
    }

    /// Load and chunk in-memory files
    pub fn ingest_files<'a, I>(&self, files: I) -> Result<IngestBatch>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        self.chunk_report(FileLoader::load_files(files)?)
    }

    fn chunk_report(&self, report: LoadReport) -> Result<IngestBatch> {
        let chunks = self.chunker.chunk(&report.records)?;
        let words: usize = report.records.iter().map(|r| r.word_count()).sum();

        tracing::info!(
            "Chunked {} record(s) ({} words) from {} file(s) into {} chunk(s) (size={}, overlap={})",
            report.records.len(),
            words,
            report.files_loaded,
            chunks.len(),
            self.chunker.params().chunk_size(),
            self.chunker.params().overlap()
        );

        Ok(IngestBatch {
            chunks,
            files_loaded: report.files_loaded,
            records_loaded: report.records.len(),
            warnings: report.warnings,
        })
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(ChunkParams::default())
    }
}
