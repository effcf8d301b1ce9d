use crate::error::{PipelineError, Result};
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 75;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_EMBED_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Process-wide pipeline configuration, constructed once at startup and
/// passed by value into every pipeline call. No stage reads the process
/// environment itself.
///
/// The same `embedding_model` is used at ingestion and query time; mixing
/// models against one collection is a configuration error the store
/// reports as a dimensionality mismatch.
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub api_key: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub chat_model: String,
    pub embed_delay: Duration,
    pub request_timeout: Duration,
}

impl ProcessingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embed_delay: Duration::from_millis(DEFAULT_EMBED_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Reads `GEMINI_API_KEY` and validates eagerly so a missing credential
    /// fails at startup, not mid-ingestion.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| PipelineError::Input("GEMINI_API_KEY is not set".to_string()))?;
        let config = Self::new(api_key);
        config.validate()?;
        Ok(config)
    }

    /// Rejects degenerate chunking parameters before any extraction or
    /// chunking runs. `overlap >= size` would re-emit the same window
    /// forever; there is no degrade-to-zero-overlap mode.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::Input("api key is empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::Input("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::Input(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}
