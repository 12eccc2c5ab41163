//! # HyperSockets Traits
//!
//! Core types shared by the HyperSockets client:
//!
//! - **WsMessage**: transport-neutral text/binary frame
//! - **HyperSocketError**: error type for every transport operation

pub mod error;
pub mod message;

// Re-export commonly used types
pub use error::{HyperSocketError, Result};
pub use message::WsMessage;
