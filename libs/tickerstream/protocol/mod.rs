//! Exchange wire protocols
//!
//! Each adapter translates between one exchange's frames and the neutral
//! vocabulary used by [`Connection`](crate::connection::Connection):
//!
//! | Exchange | Subscribe | Frames | Keep-alive | Confirmation |
//! |----------|-----------|--------|------------|--------------|
//! | Binance (`ba`) | batched `SUBSCRIBE` | text JSON | server `ping`, client `pong` | first tick |
//! | OKX (`oe`) | batched `subscribe` | text JSON | client `ping` after silence | `subscribe` event |
//! | Huobi (`hb`) | one `sub` per symbol | gzip JSON | server `{"ping":N}`, client `{"pong":N}` | first tick |

mod binance;
mod huobi;
mod okx;

pub use binance::BinanceAdapter;
pub use huobi::HuobiAdapter;
pub use okx::OkxAdapter;

use crate::config::ExchangeConfig;
use crate::domain::{Exchange, Ticker};
use crate::error::ProtocolError;
use hypersockets::WsMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Price update
    Ticker(Ticker),
    /// Server-initiated ping; the contained frame must be sent back immediately
    KeepAliveRequest(WsMessage),
    /// Server confirmed the subscription for this symbol
    SubscribeAck(String),
}

/// How a connection keeps the exchange from dropping it
#[derive(Debug, Clone, PartialEq)]
pub enum KeepAlive {
    /// Server pings, replies come out of `decode`
    Passive,
    /// Client must send `payload` after `idle` without inbound traffic
    Active { idle: Duration, payload: WsMessage },
}

/// Pure encode/decode logic for one exchange
///
/// Adapters are selected once, when a connection is built, and hold no state
/// beyond a message-id counter.
pub trait ProtocolAdapter: Send + Sync + 'static {
    /// Exchange served by this adapter
    fn exchange(&self) -> Exchange;

    /// Streaming endpoint
    fn url(&self) -> &str;

    /// Registry key for a consumer-supplied symbol
    ///
    /// Must match the symbol the adapter puts into decoded tickers.
    fn normalize_symbol(&self, symbol: &str) -> String {
        symbol.to_string()
    }

    /// Frames subscribing to `symbols` (empty input yields no frames)
    fn encode_subscribe(&self, symbols: &[String]) -> Vec<WsMessage>;

    /// Frames unsubscribing from `symbols` (empty input yields no frames)
    fn encode_unsubscribe(&self, symbols: &[String]) -> Vec<WsMessage>;

    /// Decode one inbound frame
    ///
    /// `Ok(None)` means the frame was understood but carries nothing for the
    /// connection (pongs, subscribe results, unrelated channels).
    fn decode(&self, frame: &WsMessage) -> Result<Option<Inbound>, ProtocolError>;

    /// Keep-alive convention of the exchange
    fn keep_alive(&self) -> KeepAlive;
}

/// Build the adapter for `exchange`
pub fn adapter_for(exchange: Exchange, config: &ExchangeConfig) -> Arc<dyn ProtocolAdapter> {
    match exchange {
        Exchange::Binance => Arc::new(BinanceAdapter::new(config.url.clone())),
        Exchange::Okx => Arc::new(OkxAdapter::new(
            config.url.clone(),
            config.keepalive_secs.map(Duration::from_secs),
        )),
        Exchange::Huobi => Arc::new(HuobiAdapter::new(config.url.clone())),
    }
}

/// Monotonic request id, starting at 1
#[derive(Debug)]
pub(crate) struct MessageSeq(AtomicU64);

impl MessageSeq {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Parse a decimal string field
pub(crate) fn parse_f64(field: &'static str, value: &str) -> Result<f64, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Parse an integer string field
pub(crate) fn parse_i64(field: &'static str, value: &str) -> Result<i64, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
