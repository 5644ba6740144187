//! Error types for a probe session.
//!
//! Every variant ends the session. Nothing here is retried.

use std::io;

/// The generator could not produce the requested bytes.
#[derive(Debug, thiserror::Error)]
#[error("failed to read stream: {0}")]
pub struct GenerationError(#[from] rand::Error);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("read from conn {peer} failed: {source}")]
    Read {
        peer: String,
        #[source]
        source: io::Error,
    },

    #[error("write to conn {peer} failed: {source}")]
    Write {
        peer: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Received bytes differ from the regenerated reference.
    #[error("mismatch on read bytes at offset {offset}: expected {expected}, got {actual}")]
    Mismatch {
        /// Stream offset of the first differing byte.
        offset: u64,
        /// Hex excerpt of the reference starting at `offset`.
        expected: String,
        /// Hex excerpt of the received bytes starting at `offset`.
        actual: String,
    },

    #[error("transmit task failed: {0}")]
    Transmit(#[from] tokio::task::JoinError),
}

impl SessionError {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, SessionError::Mismatch { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to listen on {0}: {1}")]
    Bind(String, io::Error),
    #[error("failed to accept connection: {0}")]
    Accept(io::Error),
    #[error("failed to connect to server {0}: {1}")]
    Connect(String, io::Error),
}
