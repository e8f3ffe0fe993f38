//! Error types for talking to the chat backend.

use thiserror::Error;

/// Why a chat cycle failed.
///
/// Every variant ends the cycle with the same user-facing error message; the
/// distinction only reaches the logs.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Request could not be built or sent.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response carried no body to stream.
    #[error("response has no body")]
    MissingBody,

    /// Reading the body failed part-way.
    #[error("stream read failed: {0}")]
    Read(String),

    /// Invalid endpoint URL.
    #[error("invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, StreamError>;
