pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_documents, split_text};
pub use config::ProcessingConfig;
pub use embeddings::{embed_chunks, GeminiEmbedder};
pub use error::{PipelineError, Result};
pub use extractor::LopdfExtractor;
pub use generation::GeminiGenerator;
pub use models::{
    Chunk, ChunkMetadata, EmbeddedChunk, GroundedAnswer, IngestionReport, PageDocument,
    SearchHit, StoredRecord,
};
pub use orchestrator::Pipeline;
pub use query::QueryEngine;
pub use stores::{MemoryStore, QdrantGateway};
pub use traits::{EmbeddingService, GenerativeService, PdfExtractor, VectorStore};
