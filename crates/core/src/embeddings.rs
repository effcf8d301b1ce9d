use crate::config::ProcessingConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, EmbeddedChunk};
use crate::traits::EmbeddingService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "gemini-embeddings";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    content: RequestContent<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini `embedContent` client. One instance embeds with one model, which
/// keeps the ingestion-time and query-time models identical by
/// construction.
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(config: &ProcessingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.endpoint, self.model, self.api_key
        );
        let body = EmbedRequest {
            content: RequestContent {
                parts: vec![RequestPart { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("{status}: {details}"),
            ));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        if parsed.embedding.values.is_empty() {
            return Err(PipelineError::rejected(SERVICE, "no embedding returned"));
        }

        Ok(parsed.embedding.values)
    }
}

/// Embeds chunks one at a time with a fixed pause between calls, so batch
/// ingestion stays under external rate limits. The first failure aborts
/// the batch; chunking is deterministic, so the caller can re-run the
/// whole ingestion.
pub async fn embed_chunks(
    service: &dyn EmbeddingService,
    chunks: &[Chunk],
    delay: Duration,
) -> Result<Vec<EmbeddedChunk>> {
    let mut embedded = Vec::with_capacity(chunks.len());
    let mut dimensions = None;

    for (position, chunk) in chunks.iter().enumerate() {
        if position > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let vector = service.embed(&chunk.text).await?;
        debug!(
            chunk_index = chunk.metadata.chunk_index,
            dimensions = vector.len(),
            "embedded chunk"
        );

        match dimensions {
            None => dimensions = Some(vector.len()),
            Some(expected) if expected != vector.len() => {
                return Err(PipelineError::Consistency(format!(
                    "embedding dimension changed mid-batch: {} then {}",
                    expected,
                    vector.len()
                )));
            }
            Some(_) => {}
        }

        embedded.push(EmbeddedChunk {
            chunk: chunk.clone(),
            vector,
        });
    }

    Ok(embedded)
}
