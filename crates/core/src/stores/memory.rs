use crate::error::{PipelineError, Result};
use crate::models::{ChunkMetadata, SearchHit, StoredRecord};
use crate::traits::{EmbeddingService, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process vector store with cosine scoring, the same search contract
/// as the Qdrant gateway. Useful without a running database and as the
/// injectable store in tests.
pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingService>,
    records: RwLock<Vec<MemoryRecord>>,
}

struct MemoryRecord {
    vector: Vec<f32>,
    text: String,
    metadata: ChunkMetadata,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<()> {
        // Embed into a staging buffer first so the whole batch becomes
        // visible in one write, or not at all.
        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let vector = match record.vector {
                Some(vector) => vector,
                None => self.embedder.embed(&record.text).await?,
            };
            staged.push(MemoryRecord {
                vector,
                text: record.text,
                metadata: record.metadata,
            });
        }

        let mut guard = self.records.write().await;
        let expected = guard
            .first()
            .map(|record| record.vector.len())
            .or_else(|| staged.first().map(|record| record.vector.len()));

        if let Some(expected) = expected {
            if let Some(odd) = staged.iter().find(|record| record.vector.len() != expected) {
                return Err(PipelineError::Consistency(format!(
                    "record vector dimension {} does not match collection dimension {expected}",
                    odd.vector.len()
                )));
            }
        }

        // Same chunk_id replaces rather than appends, matching the
        // deterministic point ids the Qdrant gateway writes.
        for staged_record in staged {
            let existing = guard
                .iter_mut()
                .find(|record| record.metadata.chunk_id == staged_record.metadata.chunk_id);
            match existing {
                Some(record) => *record = staged_record,
                None => guard.push(staged_record),
            }
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(PipelineError::Input("search k must be positive".to_string()));
        }

        let guard = self.records.read().await;
        if guard.is_empty() {
            return Ok(Vec::new());
        }

        if guard[0].vector.len() != query_vector.len() {
            return Err(PipelineError::Consistency(format!(
                "query vector dimension {} does not match collection dimension {}",
                query_vector.len(),
                guard[0].vector.len()
            )));
        }

        let mut hits: Vec<SearchHit> = guard
            .iter()
            .map(|record| SearchHit {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score: cosine_similarity(query_vector, &record.vector),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        Ok(hits)
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
