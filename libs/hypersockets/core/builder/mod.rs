pub mod states;

use crate::client::{ClientEvent, WebSocketClient};
use crate::config::ClientConfig;
use crate::traits::*;
use states::*;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Default handshake timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Type-state builder for WebSocketClient
///
/// This builder uses Rust's type system to enforce that required
/// fields (URL and event sink) are set before the client can be built.
pub struct WebSocketClientBuilder<U, E>
where
    U: UrlState,
    E: EventsState,
{
    _state: TypeState<U, E>,
    url: Option<String>,
    events: Option<UnboundedSender<ClientEvent>>,
    connect_timeout: Duration,
    label: Option<String>,
}

impl WebSocketClientBuilder<NoUrl, NoEvents> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            events: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            label: None,
        }
    }
}

impl Default for WebSocketClientBuilder<NoUrl, NoEvents> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<E> WebSocketClientBuilder<NoUrl, E>
where
    E: EventsState,
{
    pub fn url(self, url: impl Into<String>) -> WebSocketClientBuilder<HasUrl, E> {
        WebSocketClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            events: self.events,
            connect_timeout: self.connect_timeout,
            label: self.label,
        }
    }
}

// Event sink setting
impl<U> WebSocketClientBuilder<U, NoEvents>
where
    U: UrlState,
{
    /// Channel that receives every [`ClientEvent`] of the client
    pub fn events(self, events: UnboundedSender<ClientEvent>) -> WebSocketClientBuilder<U, HasEvents> {
        WebSocketClientBuilder {
            _state: TypeState::new(),
            url: self.url,
            events: Some(events),
            connect_timeout: self.connect_timeout,
            label: self.label,
        }
    }
}

// Optional settings
impl<U, E> WebSocketClientBuilder<U, E>
where
    U: UrlState,
    E: EventsState,
{
    /// Override the handshake timeout (default 10s)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Prefix used in log lines (defaults to the URL)
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl WebSocketClientBuilder<HasUrl, HasEvents> {
    /// Build and start the client
    ///
    /// Spawns the I/O task on the current tokio runtime and returns
    /// immediately; connection progress is reported through the event sink.
    pub fn build(self) -> Result<WebSocketClient> {
        // Both are always set once this impl is reachable
        let url = self.url.ok_or_else(|| HyperSocketError::InvalidUrl {
            url: String::new(),
            reason: "not set",
        })?;
        let events = self.events.ok_or(HyperSocketError::ClientGone)?;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(HyperSocketError::InvalidUrl {
                url,
                reason: "scheme must be ws:// or wss://",
            });
        }

        let label = self.label.unwrap_or_else(|| url.clone());

        let config = ClientConfig {
            url,
            events,
            connect_timeout: self.connect_timeout,
            label,
        };

        WebSocketClient::spawn(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_rejects_non_websocket_url() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = WebSocketClientBuilder::new()
            .url("https://example.com")
            .events(tx)
            .build();

        assert!(matches!(result, Err(HyperSocketError::InvalidUrl { .. })));
    }

    #[test]
    fn test_build_requires_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = WebSocketClientBuilder::new()
            .url("ws://127.0.0.1:1")
            .events(tx)
            .build();

        let err = result.err().unwrap();
        assert!(matches!(err, HyperSocketError::NoRuntime(_)));
        assert!(err.is_configuration());
    }
}
