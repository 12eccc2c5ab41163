use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Transport failures of a single client
#[derive(Error, Debug)]
pub enum HyperSocketError {
    /// Protocol or I/O failure reported by tungstenite
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// URL is missing or not a ws:// / wss:// URL
    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    /// Client was built outside a tokio runtime
    #[error("No tokio runtime: {0}")]
    NoRuntime(String),

    /// Handshake did not complete in time
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// Peer ended the stream without a close frame
    #[error("Connection closed without close frame")]
    ConnectionClosed,

    /// The I/O task has exited; commands can no longer be delivered
    #[error("Client task is gone")]
    ClientGone,

    /// The I/O task panicked or was cancelled
    #[error("Client task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl HyperSocketError {
    /// True for failures caused by how the client was built
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. } | Self::NoRuntime(_))
    }
}

/// Result type for hypersockets operations
pub type Result<T> = std::result::Result<T, HyperSocketError>;
