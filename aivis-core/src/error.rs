//! Error types for aivis-core

use thiserror::Error;

use crate::session::SessionState;

/// Main error type for the aivis-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Request rejected before anything was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Streaming connection error
    #[error("stream error: {0}")]
    Stream(String),

    /// Operation not allowed in the session's current state
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },
}

/// Result type alias for aivis-core
pub type Result<T> = std::result::Result<T, Error>;
