//! Ticker Feed - Main Library
//!
//! Shared exchange ticker streams for internal consumers.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, config paths)
//! - **tickerstream**: Connections, protocol adapters, dispatcher (re-exported from workspace)
//! - **hypersockets**: WebSocket library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use ticker_feed::bin_common::{load_config_from_env, ConfigType};
//! use ticker_feed::tickerstream::{Dispatcher, FeedConfig};
//! ```

// Re-export workspace libraries for convenience
pub use hypersockets;
pub use tickerstream;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{load_config_from_env, parse_args, ConfigType, WatchArgs};
}
