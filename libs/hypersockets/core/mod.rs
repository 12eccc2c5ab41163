//! Client task, builder and shared connection state
//!
//! ## Example
//!
//! ```rust,ignore
//! use hypersockets::{ClientEvent, WebSocketClient, WsMessage};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> hypersockets::Result<()> {
//!     let (events_tx, mut events_rx) = mpsc::unbounded_channel();
//!
//!     let client = WebSocketClient::builder()
//!         .url("wss://api.example.com")
//!         .events(events_tx)
//!         .build()?;
//!
//!     while let Some(event) = events_rx.recv().await {
//!         match event {
//!             ClientEvent::Connected => client.send(WsMessage::text("hello"))?,
//!             ClientEvent::Message(msg) => println!("{:?}", msg),
//!             ClientEvent::Disconnected => break,
//!             ClientEvent::Error(e) => eprintln!("{}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

pub use builder::{states, WebSocketClientBuilder};
pub use client::{ClientEvent, Metrics, WebSocketClient};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};

pub use crate::traits::*;

/// Builder with neither URL nor event sink set
pub fn builder() -> WebSocketClientBuilder<builder::states::NoUrl, builder::states::NoEvents> {
    WebSocketClientBuilder::new()
}
