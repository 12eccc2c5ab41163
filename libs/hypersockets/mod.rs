//! # HyperSockets
//!
//! A small WebSocket transport built around one tokio task per connection.
//!
//! ## Features
//!
//! - **Event driven**: every lifecycle change and inbound frame is pushed to an
//!   unbounded event channel owned by the caller
//! - **Type-state builder**: compile-time guarantees for required configuration
//! - **Lock-free handle**: atomic connection state and message counters
//! - **No hidden reconnects**: a closed client stays closed, the owner decides
//!   when to open a new one

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state,
    builder::{states, WebSocketClientBuilder},
    client::{ClientEvent, Metrics, WebSocketClient},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
};

/// Type alias for Result with HyperSocketError
pub type Result<T> = std::result::Result<T, traits::HyperSocketError>;
