use crate::error::Result;
use crate::models::{PageDocument, SearchHit, StoredRecord};
use async_trait::async_trait;
use std::path::Path;

/// PDF text extraction collaborator. Returns page documents in page order.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageDocument>>;
}

/// External embedding service. The model is fixed at construction so that
/// ingestion and query embeddings always come from the same model.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// External generative-text service.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Vector store gateway over one flat collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores all records in the collection. Records without a precomputed
    /// vector are embedded first. A record whose chunk_id is already stored
    /// replaces the earlier copy, so re-ingesting the same document does
    /// not grow the collection. Either the whole batch becomes visible to
    /// subsequent searches or the call fails.
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<()>;

    /// Returns the k nearest records, descending by similarity. A
    /// collection with fewer than k records returns all of them; `k == 0`
    /// is an input error.
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}
