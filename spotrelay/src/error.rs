//! Error types for the relay

use thiserror::Error;

/// Delivery to one downstream connection failed
///
/// Local to that connection: it is closed and dropped from the registry.
#[derive(Error, Debug)]
pub enum ConnectionWriteError {
    #[error("connection closed")]
    Closed,

    #[error("write failed: {0}")]
    Transport(String),

    #[error("cannot encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<axum::Error> for ConnectionWriteError {
    fn from(e: axum::Error) -> Self {
        ConnectionWriteError::Transport(e.to_string())
    }
}
