//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} returned HTTP {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream carried invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl AiError {
    /// Seconds the provider asked callers to wait, if it said so.
    ///
    /// The relay never retries on its own; this only ends up in the logs.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AiError::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
