use thiserror::Error;

/// Failure categories for every pipeline stage.
///
/// `Unavailable` is the only retryable kind; the pipeline never retries on
/// its own, callers decide.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("{service} unavailable: {details}")]
    Unavailable { service: String, details: String },

    #[error("{service} rejected the request: {details}")]
    Rejected { service: String, details: String },

    #[error("consistency error: {0}")]
    Consistency(String),
}

impl PipelineError {
    pub fn unavailable(service: &str, details: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.to_string(),
            details: details.into(),
        }
    }

    pub fn rejected(service: &str, details: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.to_string(),
            details: details.into(),
        }
    }

    /// Classifies a transport-level `reqwest` failure. Connection and
    /// timeout problems are `Unavailable`; anything else (payload decode,
    /// redirect policy) counts as a rejection by the service.
    pub fn from_http(service: &str, error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::unavailable(service, error.to_string())
        } else {
            Self::rejected(service, error.to_string())
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(PipelineError::unavailable("qdrant", "connection refused").is_retryable());
        assert!(!PipelineError::rejected("gemini", "401 unauthorized").is_retryable());
        assert!(!PipelineError::Input("empty query".to_string()).is_retryable());
        assert!(!PipelineError::Consistency("dim 768 != 128".to_string()).is_retryable());
    }

    #[test]
    fn error_messages_name_the_service() {
        let error = PipelineError::unavailable("qdrant", "connection refused");
        assert_eq!(error.to_string(), "qdrant unavailable: connection refused");
    }
}
