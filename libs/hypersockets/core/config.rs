use crate::client::ClientEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Configuration for WebSocketClient
///
/// This struct holds everything needed to spawn a client task.
/// It is built using the type-state builder pattern.
pub struct ClientConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Where lifecycle events and inbound frames are delivered
    pub(crate) events: UnboundedSender<ClientEvent>,

    /// Maximum time allowed for the TCP + TLS + upgrade handshake
    pub(crate) connect_timeout: Duration,

    /// Label used as the log prefix
    pub(crate) label: String,
}

impl ClientConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Log label
    pub fn label(&self) -> &str {
        &self.label
    }
}
