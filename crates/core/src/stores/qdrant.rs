use crate::error::{PipelineError, Result};
use crate::models::{ChunkMetadata, SearchHit, StoredRecord};
use crate::traits::{EmbeddingService, VectorStore};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

const SERVICE: &str = "qdrant";

/// HTTP gateway to one Qdrant collection, created with cosine distance so
/// scores are cosine similarity (higher = more similar, self-similarity
/// 1.0).
///
/// The collection handshake is lazy: the first caller performs it,
/// concurrent first-callers await the same in-flight initialization, and
/// every later call reuses the cached result.
pub struct QdrantGateway {
    endpoint: String,
    collection: String,
    vector_size: usize,
    client: Client,
    embedder: Arc<dyn EmbeddingService>,
    ready: OnceCell<()>,
}

impl QdrantGateway {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            vector_size,
            client,
            embedder,
            ready: OnceCell::new(),
        })
    }

    pub async fn connect(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.ensure_collection())
            .await?;
        Ok(())
    }

    async fn ensure_collection(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.endpoint, self.collection);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return self.create_collection().await;
        }

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("{status}: {details}"),
            ));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        if let Some(size) = parsed
            .pointer("/result/config/params/vectors/size")
            .and_then(Value::as_u64)
        {
            if size as usize != self.vector_size {
                return Err(PipelineError::Consistency(format!(
                    "collection {} holds {size}-dimensional vectors, configured for {}",
                    self.collection, self.vector_size
                )));
            }
        }

        Ok(())
    }

    async fn create_collection(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.endpoint, self.collection);
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("create collection: {status}: {details}"),
            ));
        }

        info!(
            collection = %self.collection,
            vector_size = self.vector_size,
            "created qdrant collection"
        );
        Ok(())
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.vector_size {
            return Err(PipelineError::Consistency(format!(
                "vector dimension {len} does not match collection dimension {}",
                self.vector_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantGateway {
    async fn upsert(&self, records: Vec<StoredRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.connect().await?;

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let vector = match record.vector {
                Some(vector) => vector,
                None => self.embedder.embed(&record.text).await?,
            };
            self.check_dimensions(vector.len())?;

            // Point ids derive from the deterministic chunk_id, so
            // re-ingesting the same file overwrites its earlier records
            // instead of appending duplicates.
            points.push(json!({
                "id": point_id(&record.metadata.chunk_id).to_string(),
                "vector": vector,
                "payload": {
                    "text": record.text,
                    "chunk_id": record.metadata.chunk_id,
                    "source": record.metadata.source,
                    "page": record.metadata.page,
                    "chunk_index": record.metadata.chunk_index,
                },
            }));
        }

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("upsert: {status}: {details}"),
            ));
        }

        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(PipelineError::Input("search k must be positive".to_string()));
        }
        self.check_dimensions(query_vector.len())?;
        self.connect().await?;

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|error| PipelineError::from_http(SERVICE, error))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(PipelineError::rejected(
                SERVICE,
                format!("search: {status}: {details}"),
            ));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|error| PipelineError::rejected(SERVICE, error.to_string()))?;

        Ok(parse_search_hits(&parsed))
    }
}

pub(crate) fn point_id(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes())
}

pub(crate) fn parse_search_hits(payload: &Value) -> Vec<SearchHit> {
    let hits = payload
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            SearchHit {
                text,
                metadata: ChunkMetadata {
                    chunk_id: hit
                        .pointer("/payload/chunk_id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    source: hit
                        .pointer("/payload/source")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    page: hit
                        .pointer("/payload/page")
                        .and_then(Value::as_u64)
                        .unwrap_or_default() as u32,
                    chunk_index: hit
                        .pointer("/payload/chunk_index")
                        .and_then(Value::as_u64)
                        .unwrap_or_default(),
                },
                score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_search_hits, point_id, QdrantGateway};
    use crate::error::{PipelineError, Result};
    use crate::traits::EmbeddingService;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingService for ConstantEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    /// Minimal collection endpoint that counts requests and always reports
    /// a 3-dimensional collection.
    fn spawn_collection_stub(requests: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let address = listener.local_addr().expect("stub address");

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                requests.fetch_add(1, Ordering::SeqCst);

                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request);

                let body = r#"{"result":{"config":{"params":{"vectors":{"size":3}}}}}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{address}")
    }

    fn gateway(endpoint: &str, vector_size: usize) -> QdrantGateway {
        QdrantGateway::new(
            endpoint,
            "pdf_chunks",
            vector_size,
            Duration::from_secs(5),
            Arc::new(ConstantEmbedder),
        )
        .expect("gateway")
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_initialization() {
        let requests = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_collection_stub(requests.clone());
        let gateway = gateway(&endpoint, 3);

        let (a, b, c, d) = tokio::join!(
            gateway.connect(),
            gateway.connect(),
            gateway.connect(),
            gateway.connect()
        );
        a.expect("connect");
        b.expect("connect");
        c.expect("connect");
        d.expect("connect");

        assert_eq!(requests.load(Ordering::SeqCst), 1);

        gateway.connect().await.expect("connect again");
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn existing_collection_with_other_dimensions_is_a_consistency_error() {
        let requests = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn_collection_stub(requests.clone());
        let gateway = gateway(&endpoint, 4);

        let result = gateway.connect().await;
        assert!(matches!(result, Err(PipelineError::Consistency(_))));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_retryable_unavailable_error() {
        // Port reserved and then released, so nothing is listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let gateway = gateway(&format!("http://127.0.0.1:{port}"), 3);

        let result = gateway.connect().await;
        match result {
            Err(error) => assert!(error.is_retryable(), "expected retryable, got {error:?}"),
            Ok(()) => panic!("connect should fail with nothing listening"),
        }
    }

    #[test]
    fn point_ids_are_deterministic_per_chunk() {
        assert_eq!(point_id("abc123"), point_id("abc123"));
        assert_ne!(point_id("abc123"), point_id("def456"));
    }

    #[test]
    fn search_hits_carry_score_text_and_provenance() {
        let payload = json!({
            "result": [
                {
                    "id": "7b2e...",
                    "score": 0.91,
                    "payload": {
                        "text": "Employees accrue 20 days of leave.",
                        "chunk_id": "abc123",
                        "source": "/tmp/handbook.pdf",
                        "page": 4,
                        "chunk_index": 11,
                    }
                },
                {
                    "id": "9c1f...",
                    "score": 0.58,
                    "payload": {
                        "text": "Sick leave requires a certificate.",
                        "chunk_id": "def456",
                        "source": "/tmp/handbook.pdf",
                        "page": 5,
                        "chunk_index": 14,
                    }
                }
            ]
        });

        let hits = parse_search_hits(&payload);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].metadata.chunk_id, "abc123");
        assert_eq!(hits[0].metadata.page, 4);
        assert_eq!(hits[1].metadata.chunk_index, 14);
        assert!(hits[0].text.contains("20 days"));
    }

    #[test]
    fn missing_result_array_parses_to_no_hits() {
        assert!(parse_search_hits(&json!({"status": "ok"})).is_empty());
    }

    #[test]
    fn hits_without_payload_fields_default_cleanly() {
        let payload = json!({"result": [{"id": 1, "score": 0.2}]});
        let hits = parse_search_hits(&payload);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "");
        assert_eq!(hits[0].metadata.page, 0);
    }
}
