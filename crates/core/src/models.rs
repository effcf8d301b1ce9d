use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One physical PDF page in page order, as produced by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub text: String,
    pub page: u32,
    pub source: String,
}

/// Provenance carried by every chunk and stored record.
///
/// `chunk_id` is a deterministic digest of the source, page, index, and
/// text, so re-ingesting the same file with the same config reproduces the
/// same ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub chunk_id: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: u64,
}

/// Bounded text window derived from one page, with character overlap into
/// its successor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk paired with its embedding, the unit handed to the store.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// The persisted unit inside the vector store. A record without a vector
/// is embedded by the gateway before it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub vector: Option<Vec<f32>>,
}

impl From<EmbeddedChunk> for StoredRecord {
    fn from(value: EmbeddedChunk) -> Self {
        Self {
            text: value.chunk.text,
            metadata: value.chunk.metadata,
            vector: Some(value.vector),
        }
    }
}

/// One retrieved record with its similarity score.
///
/// Scores are cosine similarity in both store implementations: higher is
/// more similar, self-similarity is 1.0 up to float rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Generated answer plus the evidence it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub results: Vec<SearchHit>,
}

/// Outcome of one `process_pdf` run, for logging and CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
    pub embedding_dimensions: usize,
    pub ingested_at: DateTime<Utc>,
}
