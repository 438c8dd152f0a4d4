use thiserror::Error;

/// Core error type for the research pipeline.
///
/// None of these variants are fatal to a run: every component recovers
/// locally to a defined default value, so the loop controller always
/// produces a well-formed final result. The variants exist so that the
/// degradation paths can log what actually went wrong.
#[derive(Error, Debug)]
pub enum ResearchError {
    /// Query planning produced nothing parseable.
    #[error("Query planning failed: {0}")]
    Planning(String),

    /// A single search query failed (timeout, rate limit, transport).
    #[error("Search request failed: {0}")]
    Search(String),

    /// Sufficiency evaluation failed (model call or parse).
    #[error("Reflection failed: {0}")]
    Reflection(String),

    /// Answer synthesis failed (model call or parse).
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// No structured payload could be decoded from a model response.
    #[error("Failed to decode model response: {0}")]
    Decode(String),

    /// Network/HTTP errors.
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Missing or unusable credentials and other configuration problems.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for research operations.
pub type ResearchResult<T> = Result<T, ResearchError>;

impl From<reqwest::Error> for ResearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResearchError::Network(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            ResearchError::Network(format!("Connection failed: {err}"))
        } else if let Some(status) = err.status() {
            ResearchError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ResearchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ResearchError {
    fn from(err: serde_json::Error) -> Self {
        ResearchError::Decode(err.to_string())
    }
}
