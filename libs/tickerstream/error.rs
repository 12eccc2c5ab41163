use crate::config::ConfigError;
use hypersockets::HyperSocketError;
use thiserror::Error;

/// Caller-facing errors of the feed
///
/// Transport and decode failures are contained inside a connection and never
/// reach consumers; only usage and setup errors are returned here.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Exchange code is not one of "ba", "oe", "hb"
    #[error("Unknown exchange code: {0}")]
    UnknownExchange(String),

    /// Transport could not be created
    #[error("Transport error: {0}")]
    Transport(#[from] HyperSocketError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors while decoding a single inbound frame
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to decompress frame: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number in field {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Unexpected frame type: {0}")]
    UnexpectedFrame(&'static str),
}

pub type Result<T> = std::result::Result<T, FeedError>;
