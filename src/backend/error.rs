// src/backend/error.rs

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to a chat backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network, TLS or DNS failure, or a body that broke off mid-stream.
    #[error("{0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("API request failed: {status}")]
    Status { status: u16 },

    /// A non-streaming body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Nothing to send: no text and no attachments.
    #[error("message is empty")]
    EmptyMessage,

    /// Another ask is still streaming on the same adapter.
    #[error("another request is already in progress")]
    Busy,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl BackendError {
    /// Render the error the way it is shown in place of an assistant reply.
    pub fn to_reply(&self) -> String {
        format!(
            "Error: {}. Please check your AI service configuration.",
            self
        )
    }
}
