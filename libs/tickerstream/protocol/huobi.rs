//! Huobi market ticker stream
//!
//! Every server frame is gzip-compressed JSON sent as a binary message.
//!
//! Subscribe (one request per symbol):
//! ```json
//! {"sub":"market.btcusdt.ticker","id":1}
//! ```
//!
//! Tick:
//! ```json
//! {"ch":"market.btcusdt.ticker","ts":1630982370526,"tick":{"open":51732,"close":52735.63,"lastPrice":52735.63}}
//! ```
//!
//! Heartbeat: server sends `{"ping":1492420473027}`, client must echo
//! `{"pong":1492420473027}`.

use super::{Inbound, KeepAlive, MessageSeq, ProtocolAdapter};
use crate::domain::{Exchange, Ticker};
use crate::error::ProtocolError;
use flate2::read::GzDecoder;
use hypersockets::WsMessage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Read;
use tracing::{debug, warn};

const TOPIC_PREFIX: &str = "market.";
const TOPIC_SUFFIX: &str = ".ticker";

#[derive(Debug, Serialize)]
struct HuobiSub {
    sub: String,
    id: u64,
}

#[derive(Debug, Serialize)]
struct HuobiUnsub {
    unsub: String,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct HuobiTick {
    ch: String,
    ts: i64,
    tick: HuobiTickBody,
}

#[derive(Debug, Deserialize)]
struct HuobiTickBody {
    #[serde(rename = "lastPrice")]
    last_price: f64,
}

pub struct HuobiAdapter {
    url: String,
    seq: MessageSeq,
}

impl HuobiAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            seq: MessageSeq::new(),
        }
    }

    fn topic(symbol: &str) -> String {
        format!("{}{}{}", TOPIC_PREFIX, symbol, TOPIC_SUFFIX)
    }

    /// Symbol out of `market.<symbol>.ticker`
    fn symbol_of(channel: &str) -> Option<&str> {
        channel
            .strip_prefix(TOPIC_PREFIX)?
            .strip_suffix(TOPIC_SUFFIX)
            .filter(|s| !s.is_empty())
    }

    fn unzip(bytes: &[u8]) -> Result<String, ProtocolError> {
        let mut text = String::new();
        GzDecoder::new(bytes).read_to_string(&mut text)?;
        Ok(text)
    }
}

impl ProtocolAdapter for HuobiAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Huobi
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn normalize_symbol(&self, symbol: &str) -> String {
        symbol.to_lowercase()
    }

    fn encode_subscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        symbols
            .iter()
            .filter_map(|symbol| {
                let request = HuobiSub {
                    sub: Self::topic(symbol),
                    id: self.seq.next(),
                };
                match serde_json::to_string(&request) {
                    Ok(text) => Some(WsMessage::Text(text)),
                    Err(e) => {
                        warn!("[Huobi WS] Failed to encode sub for {}: {}", symbol, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn encode_unsubscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        symbols
            .iter()
            .filter_map(|symbol| {
                let request = HuobiUnsub {
                    unsub: Self::topic(symbol),
                    id: self.seq.next(),
                };
                match serde_json::to_string(&request) {
                    Ok(text) => Some(WsMessage::Text(text)),
                    Err(e) => {
                        warn!("[Huobi WS] Failed to encode unsub for {}: {}", symbol, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn decode(&self, frame: &WsMessage) -> Result<Option<Inbound>, ProtocolError> {
        let text = match frame {
            WsMessage::Binary(bytes) => Self::unzip(bytes)?,
            WsMessage::Text(text) => text.clone(),
        };

        let value: Value = serde_json::from_str(&text)?;

        if let Some(nonce) = value.get("ping") {
            let pong = json!({ "pong": nonce });
            return Ok(Some(Inbound::KeepAliveRequest(WsMessage::Text(pong.to_string()))));
        }

        if value.get("status").and_then(Value::as_str) == Some("error") {
            warn!(
                "[Huobi WS] Request rejected: {} {}",
                value.get("err-code").unwrap_or(&serde_json::Value::Null),
                value.get("err-msg").unwrap_or(&serde_json::Value::Null)
            );
            return Ok(None);
        }

        if let Some(subbed) = value.get("subbed").and_then(Value::as_str) {
            debug!("[Huobi WS] Subscribed to {}", subbed);
            return Ok(None);
        }

        let is_ticker = value
            .get("ch")
            .and_then(Value::as_str)
            .and_then(Self::symbol_of)
            .is_some();
        if !is_ticker {
            return Ok(None);
        }

        if value.get("tick").is_none() {
            return Err(ProtocolError::MissingField("tick"));
        }

        let tick: HuobiTick = serde_json::from_value(value)?;
        let symbol = Self::symbol_of(&tick.ch)
            .ok_or(ProtocolError::MissingField("ch"))?
            .to_string();

        Ok(Some(Inbound::Ticker(Ticker::new(tick.ts, symbol, tick.tick.last_price))))
    }

    fn keep_alive(&self) -> KeepAlive {
        KeepAlive::Passive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(text: &str) -> WsMessage {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        WsMessage::Binary(encoder.finish().unwrap())
    }

    fn adapter() -> HuobiAdapter {
        HuobiAdapter::new("wss://api.huobi.pro/ws")
    }

    #[test]
    fn test_subscribe_is_one_frame_per_symbol() {
        let frames = adapter().encode_subscribe(&["btcusdt".to_string(), "ethusdt".to_string()]);
        assert_eq!(
            frames,
            vec![
                WsMessage::text(r#"{"sub":"market.btcusdt.ticker","id":1}"#),
                WsMessage::text(r#"{"sub":"market.ethusdt.ticker","id":2}"#),
            ]
        );
    }

    #[test]
    fn test_unsubscribe_encoding() {
        let frames = adapter().encode_unsubscribe(&["btcusdt".to_string()]);
        assert_eq!(frames, vec![WsMessage::text(r#"{"unsub":"market.btcusdt.ticker","id":1}"#)]);
        assert!(adapter().encode_unsubscribe(&[]).is_empty());
    }

    #[test]
    fn test_decode_gzip_tick() {
        let frame = gzip(
            r#"{"ch":"market.btcusdt.ticker","ts":1630982370526,"tick":{"open":51732,"high":52785.64,"low":51000,"close":52735.63,"amount":13259.24,"lastPrice":52735.63,"lastSize":0.00138}}"#,
        );
        assert_eq!(
            adapter().decode(&frame).unwrap(),
            Some(Inbound::Ticker(Ticker::new(1_630_982_370_526, "btcusdt", 52735.63)))
        );
    }

    #[test]
    fn test_decode_ping_echoes_nonce() {
        let frame = gzip(r#"{"ping":1492420473027}"#);
        assert_eq!(
            adapter().decode(&frame).unwrap(),
            Some(Inbound::KeepAliveRequest(WsMessage::text(r#"{"pong":1492420473027}"#)))
        );
    }

    #[test]
    fn test_decode_control_frames() {
        let huobi = adapter();
        assert_eq!(
            huobi
                .decode(&gzip(r#"{"id":"1","status":"ok","subbed":"market.btcusdt.ticker","ts":1}"#))
                .unwrap(),
            None
        );
        assert_eq!(
            huobi
                .decode(&gzip(r#"{"status":"error","err-code":"bad-request","err-msg":"invalid topic","ts":1}"#))
                .unwrap(),
            None
        );
        assert_eq!(huobi.decode(&gzip(r#"{"status":"error","ts":1}"#)).unwrap(), None);
        assert_eq!(
            huobi
                .decode(&gzip(r#"{"ch":"market.btcusdt.kline.1min","ts":1,"tick":{"close":1}}"#))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_plain_text_frames() {
        assert_eq!(
            adapter().decode(&WsMessage::text(r#"{"ping":7}"#)).unwrap(),
            Some(Inbound::KeepAliveRequest(WsMessage::text(r#"{"pong":7}"#)))
        );
    }

    #[test]
    fn test_decode_corrupt_gzip() {
        assert!(matches!(
            adapter().decode(&WsMessage::Binary(vec![0x1f, 0x8b, 0x00])),
            Err(ProtocolError::Gzip(_))
        ));
    }

    #[test]
    fn test_symbols_are_normalized_to_lowercase() {
        assert_eq!(adapter().normalize_symbol("BTCUSDT"), "btcusdt");
    }
}
