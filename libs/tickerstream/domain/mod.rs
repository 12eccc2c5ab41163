//! Domain types shared by every layer of the feed

use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Ticker
// =============================================================================

/// One price update for a symbol
///
/// Created fresh for every inbound tick and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Exchange event time (ms since epoch)
    pub timestamp: i64,
    /// Exchange-native symbol, e.g. "BTCUSDT" or "BTC-USDT"
    pub symbol: String,
    /// Last traded price
    pub price: f64,
}

impl Ticker {
    pub fn new(timestamp: i64, symbol: impl Into<String>, price: f64) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            price,
        }
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Binance,
    Okx,
    Huobi,
}

impl Exchange {
    /// Short code used by consumers ("ba", "oe", "hb")
    pub fn code(&self) -> &'static str {
        match self {
            Exchange::Binance => "ba",
            Exchange::Okx => "oe",
            Exchange::Huobi => "hb",
        }
    }

    /// Human readable name, used as log prefix
    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Binance => "Binance",
            Exchange::Okx => "OKX",
            Exchange::Huobi => "Huobi",
        }
    }

    /// Parse an exchange code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ba" => Some(Exchange::Binance),
            "oe" => Some(Exchange::Okx),
            "hb" => Some(Exchange::Huobi),
            _ => None,
        }
    }

    /// True when the client, not the server, has to ping a quiet line
    pub fn client_pings(&self) -> bool {
        matches!(self, Exchange::Okx)
    }

    /// All supported exchanges
    pub fn all() -> &'static [Exchange] {
        &[Exchange::Binance, Exchange::Okx, Exchange::Huobi]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Exchange {
    type Err = FeedError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Exchange::from_code(code).ok_or_else(|| FeedError::UnknownExchange(code.to_string()))
    }
}

// =============================================================================
// WatchState
// =============================================================================

/// Subscription lifecycle of one symbol inside a connection
///
/// ```text
/// Waiting      --(transport ready)-->             Subscribing
/// Subscribing  --(ack or first matching tick)-->  Watching
/// Subscribing  --(transport closed)-->            Waiting
/// Subscribing  --(no ack/tick in time)-->         removed, unsubscribe sent
/// Watching     --(no consumers for too long)-->   removed, unsubscribe sent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchState {
    /// Wanted, but the transport is not ready yet
    Waiting,
    /// Subscribe request sent, no confirmation yet
    Subscribing,
    /// Confirmed, ticks are flowing
    Watching,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchState::Waiting => "waiting",
            WatchState::Subscribing => "subscribing",
            WatchState::Watching => "watching",
        };
        write!(f, "{}", s)
    }
}
