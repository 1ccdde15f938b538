//! Error types for quakepulse.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur while talking to the earthquake feed.
///
/// Normalizing an individual record is total and has no error path;
/// only transport and response-shape problems surface here.
#[derive(Error, Debug)]
pub enum QuakeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed returned an error status
    #[error("Feed error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body was not the expected JSON array
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
