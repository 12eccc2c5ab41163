//! Seam between a connection and the socket it talks through

use hypersockets::{ClientEvent, WebSocketClient, WsMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Transport event tagged with the generation of the transport that produced it
///
/// Every transport a connection opens gets the next generation number, so
/// late events from a replaced transport can be told apart.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: ClientEvent,
}

pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

/// Handle to one open (or opening) transport
pub trait TransportLink: Send {
    /// Queue a frame; frames queued before the handshake go out once it completes
    fn send(&self, message: WsMessage) -> hypersockets::Result<()>;

    /// Request shutdown without waiting for it
    fn close(&self);
}

/// Factory for transports
pub trait Connector: Send + Sync + 'static {
    /// Start connecting to `url`
    ///
    /// Lifecycle and inbound frames are reported on `sink` tagged with
    /// `generation`.
    fn open(
        &self,
        url: &str,
        generation: u64,
        sink: EventSink,
    ) -> hypersockets::Result<Box<dyn TransportLink>>;
}

/// Connector backed by a `hypersockets` WebSocket client
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Connector for WsConnector {
    fn open(
        &self,
        url: &str,
        generation: u64,
        sink: EventSink,
    ) -> hypersockets::Result<Box<dyn TransportLink>> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let client = WebSocketClient::builder()
            .url(url)
            .events(tx)
            .connect_timeout(self.connect_timeout)
            .label(format!("{}#{}", url, generation))
            .build()?;

        tokio::spawn(async move {
            while let Some(kind) = rx.recv().await {
                if sink.send(TransportEvent { generation, kind }).is_err() {
                    debug!("Connection gone, dropping events of transport #{}", generation);
                    break;
                }
            }
        });

        Ok(Box::new(WsLink { client }))
    }
}

struct WsLink {
    client: WebSocketClient,
}

impl TransportLink for WsLink {
    fn send(&self, message: WsMessage) -> hypersockets::Result<()> {
        self.client.send(message)
    }

    fn close(&self) {
        self.client.close();
    }
}
