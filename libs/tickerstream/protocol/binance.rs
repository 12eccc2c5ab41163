//! Binance mini-ticker stream
//!
//! Subscribe:
//! ```json
//! {"method":"SUBSCRIBE","params":["btcusdt@miniTicker"],"id":1}
//! ```
//!
//! Tick:
//! ```json
//! {"e":"24hrMiniTicker","E":1672515782136,"s":"BTCUSDT","c":"16500.12","o":"16400.00","h":"16600.00","l":"16300.00","v":"100","q":"1650000"}
//! ```

use super::{parse_f64, Inbound, KeepAlive, MessageSeq, ProtocolAdapter};
use crate::domain::{Exchange, Ticker};
use crate::error::ProtocolError;
use hypersockets::WsMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const MINI_TICKER_EVENT: &str = "24hrMiniTicker";
const STREAM_SUFFIX: &str = "@miniTicker";

#[derive(Debug, Serialize)]
struct BinanceRequest {
    method: &'static str,
    params: Vec<String>,
    id: u64,
}

/// Subset of the mini-ticker payload used by the feed
#[derive(Debug, Deserialize)]
struct BinanceMiniTicker {
    /// Event time (ms since epoch)
    #[serde(rename = "E")]
    event_time: i64,

    /// Symbol (e.g., "BTCUSDT")
    #[serde(rename = "s")]
    symbol: String,

    /// Close price as string
    #[serde(rename = "c")]
    close: String,
}

pub struct BinanceAdapter {
    url: String,
    seq: MessageSeq,
}

impl BinanceAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            seq: MessageSeq::new(),
        }
    }

    fn request(&self, method: &'static str, symbols: &[String]) -> Vec<WsMessage> {
        if symbols.is_empty() {
            return Vec::new();
        }

        let request = BinanceRequest {
            method,
            params: symbols
                .iter()
                .map(|s| format!("{}{}", s.to_lowercase(), STREAM_SUFFIX))
                .collect(),
            id: self.seq.next(),
        };

        match serde_json::to_string(&request) {
            Ok(text) => vec![WsMessage::Text(text)],
            Err(e) => {
                warn!("[Binance WS] Failed to encode {} request: {}", method, e);
                Vec::new()
            }
        }
    }
}

impl ProtocolAdapter for BinanceAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn normalize_symbol(&self, symbol: &str) -> String {
        symbol.to_uppercase()
    }

    fn encode_subscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.request("SUBSCRIBE", symbols)
    }

    fn encode_unsubscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.request("UNSUBSCRIBE", symbols)
    }

    fn decode(&self, frame: &WsMessage) -> Result<Option<Inbound>, ProtocolError> {
        let text = frame
            .as_text()
            .ok_or(ProtocolError::UnexpectedFrame("binary"))?;

        if text == "ping" {
            return Ok(Some(Inbound::KeepAliveRequest(WsMessage::text("pong"))));
        }

        let value: Value = serde_json::from_str(text)?;

        if value.get("e").and_then(Value::as_str) == Some(MINI_TICKER_EVENT) {
            let tick: BinanceMiniTicker = serde_json::from_value(value)?;
            let price = parse_f64("c", &tick.close)?;
            return Ok(Some(Inbound::Ticker(Ticker::new(tick.event_time, tick.symbol, price))));
        }

        if let Some(error) = value.get("error") {
            warn!("[Binance WS] Request rejected: {}", error);
        } else if value.get("result").is_some() {
            debug!(
                "[Binance WS] Request {} acknowledged",
                value.get("id").unwrap_or(&serde_json::Value::Null)
            );
        }

        Ok(None)
    }

    fn keep_alive(&self) -> KeepAlive {
        KeepAlive::Passive
    }
}
