use crate::builder::states::{NoEvents, NoUrl};
use crate::builder::WebSocketClientBuilder;
use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::traits::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Send a message to the WebSocket
    Send(WsMessage),
    /// Close the connection
    Shutdown,
}

/// Events emitted by the client task
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Handshake completed, frames may now be sent
    Connected,
    /// Text or binary frame received from the server
    Message(WsMessage),
    /// Connection is gone (always the last event of a client)
    Disconnected,
    /// Error occurred
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connection_state: ConnectionState,
}

/// Single-connection WebSocket client
///
/// Each client owns exactly one socket for its whole life:
/// - I/O runs in a dedicated tokio task
/// - Inbound frames and lifecycle changes go to the configured event sink
/// - Outbound frames are queued on an unbounded channel, `send` never blocks
/// - Once disconnected the client never reconnects; build a new one instead
///
/// Dropping the handle closes the connection.
pub struct WebSocketClient {
    url: String,
    /// Atomic connection state
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Command channel sender
    command_tx: UnboundedSender<ClientCommand>,
    /// Main task handle (tokio task for async I/O)
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WebSocketClient {
    /// Start building a client
    pub fn builder() -> WebSocketClientBuilder<NoUrl, NoEvents> {
        WebSocketClientBuilder::new()
    }

    /// Spawn the I/O task for `config`
    ///
    /// Called by the builder's `build()` method.
    pub(crate) fn spawn(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HyperSocketError::NoRuntime(e.to_string()))?;

        let url = config.url.clone();
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
        let metrics = Arc::new(AtomicMetrics::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task_handle = {
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);

            runtime.spawn(async move {
                run_client(config, state, metrics, command_rx).await;
            })
        };

        Ok(Self {
            url,
            state,
            metrics,
            command_tx,
            task_handle: Some(task_handle),
        })
    }

    /// Queue a message for sending
    ///
    /// Messages queued before the handshake completes are sent right after it.
    pub fn send(&self, message: WsMessage) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Send(message))
            .map_err(|_| HyperSocketError::ClientGone)
    }

    /// Request the connection to close without waiting for it
    pub fn close(&self) {
        if self.state.get() != ConnectionState::Disconnected {
            self.state.set(ConnectionState::ShuttingDown);
        }
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }

    /// Close the connection and wait for the I/O task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down WebSocket client for {}", self.url);
        self.close();

        if let Some(handle) = self.task_handle.take() {
            handle.await?;
        }
        Ok(())
    }

    /// URL this client connects to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            connection_state: self.state.get(),
        }
    }
}

/// Main client task
async fn run_client(
    config: ClientConfig,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    mut command_rx: UnboundedReceiver<ClientCommand>,
) {
    let label = config.label.as_str();
    debug!("[{}] Connecting to {}", label, config.url);

    let ws_stream = match tokio::time::timeout(config.connect_timeout, connect_async(config.url.as_str())).await {
        Ok(Ok((ws_stream, _))) => ws_stream,
        Ok(Err(e)) => {
            error!("[{}] Failed to connect: {}", label, e);
            finish(&config, &state, Some(e.to_string()));
            return;
        }
        Err(_) => {
            let err = HyperSocketError::HandshakeTimeout(config.connect_timeout);
            error!("[{}] {}", label, err);
            finish(&config, &state, Some(err.to_string()));
            return;
        }
    };

    // close() may have been called while the handshake was in flight
    if !state.transition(ConnectionState::Connecting, ConnectionState::Connected) {
        debug!("[{}] Closed during handshake", label);
        let mut ws_stream = ws_stream;
        let _ = ws_stream.close(None).await;
        finish(&config, &state, None);
        return;
    }

    info!("[{}] Connected to {}", label, config.url);
    let _ = config.events.send(ClientEvent::Connected);

    let (mut write, mut read) = ws_stream.split();
    let result = message_loop(&mut write, &mut read, &config, &metrics, &mut command_rx).await;

    match result {
        Ok(()) => finish(&config, &state, None),
        Err(e) => {
            warn!("[{}] Connection error: {}", label, e);
            finish(&config, &state, Some(e.to_string()));
        }
    }

    debug!(
        "[{}] Client task exiting (sent: {}, received: {})",
        label,
        metrics.messages_sent(),
        metrics.messages_received()
    );
}

/// Publish the terminal events of a client
fn finish(config: &ClientConfig, state: &AtomicConnectionState, error: Option<String>) {
    state.set(ConnectionState::Disconnected);
    if let Some(error) = error {
        let _ = config.events.send(ClientEvent::Error(error));
    }
    let _ = config.events.send(ClientEvent::Disconnected);
}

/// Main message processing loop
async fn message_loop(
    write: &mut SplitSink<WsStream, Message>,
    read: &mut SplitStream<WsStream>,
    config: &ClientConfig,
    metrics: &AtomicMetrics,
    command_rx: &mut UnboundedReceiver<ClientCommand>,
) -> Result<()> {
    let label = config.label.as_str();

    loop {
        tokio::select! {
            // Handle incoming messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Close(frame))) => {
                        info!("[{}] Server closed the connection: {:?}", label, frame);
                        return Ok(());
                    }
                    Some(Ok(msg)) => {
                        // Control frames are answered by tungstenite itself
                        if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                            metrics.increment_received();
                            if config.events.send(ClientEvent::Message(ws_msg)).is_err() {
                                debug!("[{}] Event receiver dropped, closing", label);
                                let _ = write.close().await;
                                return Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("[{}] WebSocket error: {}", label, e);
                        return Err(e.into());
                    }
                    None => {
                        warn!("[{}] WebSocket stream closed", label);
                        return Err(HyperSocketError::ConnectionClosed);
                    }
                }
            }

            // Handle commands
            cmd = command_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        write.send(ws_message_to_tungstenite(msg)).await?;
                        metrics.increment_sent();
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        debug!("[{}] Shutdown requested, closing connection", label);
                        let _ = write.close().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
