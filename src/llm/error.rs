//! Backend error types

use thiserror::Error;

/// Error types for backend invocations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Model returned no output")]
    EmptyResponse,

    #[error("Internal error: {0}")]
    Internal(String),
}
