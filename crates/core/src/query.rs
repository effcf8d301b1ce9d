use crate::error::{PipelineError, Result};
use crate::models::{GroundedAnswer, SearchHit};
use crate::traits::{EmbeddingService, GenerativeService, VectorStore};
use std::sync::Arc;
use tracing::debug;

/// Each retrieved chunk contributes at most this many characters to the
/// prompt, capping prompt size independently of chunk configuration.
pub const CONTEXT_PREVIEW_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are a careful assistant answering questions about an ingested \
document. Answer only from the numbered context excerpts provided in the user message, citing \
excerpt numbers like [1]. If the context does not contain the answer, say the information was \
not found in the document. Do not use outside knowledge and do not speculate.";

/// Embeds a question, retrieves top-k evidence, and asks the generative
/// model for an answer grounded in that evidence.
pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerativeService>,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerativeService>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
        }
    }

    pub async fn answer(&self, query: &str, top_k: usize) -> Result<GroundedAnswer> {
        if query.trim().is_empty() {
            return Err(PipelineError::Input("query is empty".to_string()));
        }
        if top_k == 0 {
            return Err(PipelineError::Input("top_k must be positive".to_string()));
        }

        let query_vector = self.embedder.embed(query).await?;
        debug!(dimensions = query_vector.len(), "embedded query");

        let results = self.store.search(&query_vector, top_k).await?;
        debug!(hits = results.len(), "retrieved context");

        let user_prompt = build_user_prompt(query, &results);
        let answer = self.generator.generate(SYSTEM_PROMPT, &user_prompt).await?;

        Ok(GroundedAnswer { answer, results })
    }
}

/// Builds the user turn. An empty retrieval is stated outright so the
/// model answers "not found" instead of inventing context.
pub(crate) fn build_user_prompt(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!(
            "No context excerpts were found in the knowledge base for this question. \
State that the information was not found in the document.\n\nQuestion: {query}"
        );
    }

    let mut prompt = String::from("Context excerpts:\n");
    for (position, hit) in hits.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] (page {}) {}\n",
            position + 1,
            hit.metadata.page,
            truncate_preview(&hit.text, CONTEXT_PREVIEW_CHARS)
        ));
    }
    prompt.push_str(&format!("\nQuestion: {query}"));
    prompt
}

fn truncate_preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let mut preview: String = text.chars().take(limit).collect();
        preview.push_str("...");
        preview
    }
}
