//! TickerStream - multiplexed exchange ticker feeds
//!
//! One streaming connection per exchange is shared by any number of
//! consumers. Subscriptions are created on demand, batched on the wire and
//! torn down by a periodic idle sweep.
//!
//! ## Architecture
//!
//! - **domain**: `Ticker`, `Exchange`, `WatchState`
//! - **protocol**: per-exchange wire adapters (Binance, OKX, Huobi)
//! - **connection**: registry, transport seam, idle sweep, keep-alive
//! - **dispatcher**: exchange routing and per-consumer rate filter
//! - **config**: YAML configuration with defaults
//! - **logging**: tracing initialization
//!
//! ## Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use tickerstream::{Dispatcher, FeedConfig};
//!
//! # async fn run() -> Result<(), tickerstream::FeedError> {
//! let dispatcher = Dispatcher::new(FeedConfig::default())?;
//! let mut ticks = dispatcher.watch("ba", "BTCUSDT", 500)?;
//! while let Some(ticker) = ticks.next().await {
//!     println!("{} {} @ {}", ticker.timestamp, ticker.symbol, ticker.price);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod logging;
pub mod protocol;

pub use config::{ConfigError, ExchangeConfig, FeedConfig, TimingConfig};
pub use connection::{Connection, ConnectionSnapshot, EntrySnapshot, TickerStream};
pub use dispatcher::{Dispatcher, RateFilter};
pub use domain::{Exchange, Ticker, WatchState};
pub use error::{FeedError, ProtocolError, Result};
pub use logging::init_tracing;
