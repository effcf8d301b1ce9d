use crate::chunking::chunk_documents;
use crate::config::ProcessingConfig;
use crate::embeddings::embed_chunks;
use crate::error::{PipelineError, Result};
use crate::models::{GroundedAnswer, IngestionReport, PageDocument, StoredRecord};
use crate::query::QueryEngine;
use crate::traits::{EmbeddingService, GenerativeService, PdfExtractor, VectorStore};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Drives the two pipeline flows over injected collaborators. Holds no
/// per-request state, so one instance serves concurrent ingestions and
/// queries.
pub struct Pipeline {
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerativeService>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerativeService>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            store,
            generator,
        }
    }

    /// Load → chunk → embed → upsert, strictly in sequence. The first
    /// failing stage aborts the run and its error propagates unchanged.
    pub async fn process_pdf(
        &self,
        path: &Path,
        config: &ProcessingConfig,
    ) -> Result<IngestionReport> {
        config.validate()?;

        let pages = self.extract_bounded(path, config).await?;
        info!(source = %path.display(), pages = pages.len(), "extracted pdf");

        let chunks = chunk_documents(&pages, config.chunk_size, config.chunk_overlap)?;
        info!(chunks = chunks.len(), "chunked pages");

        let embedded = embed_chunks(self.embedder.as_ref(), &chunks, config.embed_delay).await?;
        let embedding_dimensions = embedded
            .first()
            .map(|item| item.vector.len())
            .unwrap_or_default();

        let records: Vec<StoredRecord> = embedded.into_iter().map(StoredRecord::from).collect();
        self.store.upsert(records).await?;

        let report = IngestionReport {
            source: path.to_string_lossy().to_string(),
            pages: pages.len(),
            chunks: chunks.len(),
            embedding_dimensions,
            ingested_at: Utc::now(),
        };
        info!(
            chunks = report.chunks,
            dimensions = report.embedding_dimensions,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Runs the synchronous PDF parse off the async workers and under the
    /// configured timeout, so a pathological file cannot stall concurrent
    /// requests. Elapsing the bound is a retryable failure.
    async fn extract_bounded(
        &self,
        path: &Path,
        config: &ProcessingConfig,
    ) -> Result<Vec<PageDocument>> {
        let extractor = self.extractor.clone();
        let owned_path = path.to_path_buf();

        tokio::time::timeout(
            config.request_timeout,
            tokio::task::spawn_blocking(move || extractor.extract_pages(&owned_path)),
        )
        .await
        .map_err(|_| {
            PipelineError::unavailable(
                "pdf-extract",
                format!("parse exceeded {:?}: {}", config.request_timeout, path.display()),
            )
        })?
        .map_err(|error| PipelineError::unavailable("pdf-extract", error.to_string()))?
    }

    /// Embed the question, retrieve top-k evidence, generate a grounded
    /// answer.
    pub async fn query_knowledge_base(
        &self,
        query: &str,
        config: &ProcessingConfig,
        top_k: usize,
    ) -> Result<GroundedAnswer> {
        config.validate()?;

        QueryEngine::new(
            self.embedder.clone(),
            self.store.clone(),
            self.generator.clone(),
        )
        .answer(query, top_k)
        .await
    }
}
