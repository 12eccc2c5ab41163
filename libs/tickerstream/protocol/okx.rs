//! OKX v5 public `tickers` channel
//!
//! Subscribe:
//! ```json
//! {"op":"subscribe","args":[{"channel":"tickers","instId":"BTC-USDT"}]}
//! ```
//!
//! Ack:
//! ```json
//! {"event":"subscribe","arg":{"channel":"tickers","instId":"BTC-USDT"},"connId":"a4d3ae55"}
//! ```
//!
//! Tick:
//! ```json
//! {"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[{"instId":"BTC-USDT","last":"9999.99","ts":"1597026383085"}]}
//! ```
//!
//! OKX drops connections that stay silent for 30s, so the client sends a
//! literal `ping` after a shorter silence and the server answers `pong`.

use super::{parse_f64, parse_i64, Inbound, KeepAlive, ProtocolAdapter};
use crate::domain::{Exchange, Ticker};
use crate::error::ProtocolError;
use hypersockets::WsMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const TICKERS_CHANNEL: &str = "tickers";

/// Default silence before the client pings
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(25);

#[derive(Debug, Serialize)]
struct OkxRequest<'a> {
    op: &'static str,
    args: Vec<OkxArg<'a>>,
}

#[derive(Debug, Serialize)]
struct OkxArg<'a> {
    channel: &'static str,
    #[serde(rename = "instId")]
    inst_id: &'a str,
}

/// Envelope shared by events and data pushes
#[derive(Debug, Deserialize)]
struct OkxPush {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    arg: Option<OkxPushArg>,
    #[serde(default)]
    data: Option<Vec<OkxTickerData>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkxPushArg {
    #[serde(default)]
    channel: Option<String>,
    #[serde(rename = "instId", default)]
    inst_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkxTickerData {
    #[serde(rename = "instId", default)]
    inst_id: Option<String>,
    last: String,
    ts: String,
}

pub struct OkxAdapter {
    url: String,
    keepalive: Duration,
}

impl OkxAdapter {
    /// `keepalive` defaults to 25s when `None`
    pub fn new(url: impl Into<String>, keepalive: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            keepalive: keepalive.unwrap_or(DEFAULT_KEEPALIVE),
        }
    }

    fn request(&self, op: &'static str, symbols: &[String]) -> Vec<WsMessage> {
        if symbols.is_empty() {
            return Vec::new();
        }

        let request = OkxRequest {
            op,
            args: symbols
                .iter()
                .map(|s| OkxArg {
                    channel: TICKERS_CHANNEL,
                    inst_id: s.as_str(),
                })
                .collect(),
        };

        match serde_json::to_string(&request) {
            Ok(text) => vec![WsMessage::Text(text)],
            Err(e) => {
                warn!("[OKX WS] Failed to encode {} request: {}", op, e);
                Vec::new()
            }
        }
    }
}

impl ProtocolAdapter for OkxAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Okx
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn encode_subscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.request("subscribe", symbols)
    }

    fn encode_unsubscribe(&self, symbols: &[String]) -> Vec<WsMessage> {
        self.request("unsubscribe", symbols)
    }

    fn decode(&self, frame: &WsMessage) -> Result<Option<Inbound>, ProtocolError> {
        let text = frame
            .as_text()
            .ok_or(ProtocolError::UnexpectedFrame("binary"))?;

        if text == "pong" {
            return Ok(None);
        }

        let push: OkxPush = serde_json::from_str(text)?;

        match push.event.as_deref() {
            Some("subscribe") => {
                let inst_id = push
                    .arg
                    .and_then(|arg| arg.inst_id)
                    .ok_or(ProtocolError::MissingField("arg.instId"))?;
                return Ok(Some(Inbound::SubscribeAck(inst_id)));
            }
            Some("error") => {
                warn!(
                    "[OKX WS] Error event: code={} msg={}",
                    push.code.as_deref().unwrap_or("-"),
                    push.msg.as_deref().unwrap_or("-")
                );
                return Ok(None);
            }
            Some(other) => {
                debug!("[OKX WS] Event: {}", other);
                return Ok(None);
            }
            None => {}
        }

        let arg = match push.arg {
            Some(arg) if arg.channel.as_deref() == Some(TICKERS_CHANNEL) => arg,
            _ => return Ok(None),
        };

        let data = push
            .data
            .and_then(|data| data.into_iter().next())
            .ok_or(ProtocolError::MissingField("data[0]"))?;

        let symbol = data
            .inst_id
            .or(arg.inst_id)
            .ok_or(ProtocolError::MissingField("instId"))?;
        let timestamp = parse_i64("ts", &data.ts)?;
        let price = parse_f64("last", &data.last)?;

        Ok(Some(Inbound::Ticker(Ticker::new(timestamp, symbol, price))))
    }

    fn keep_alive(&self) -> KeepAlive {
        KeepAlive::Active {
            idle: self.keepalive,
            payload: WsMessage::text("ping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OkxAdapter {
        OkxAdapter::new("wss://ws.okx.com:8443/ws/v5/public", None)
    }

    #[test]
    fn test_subscribe_is_batched() {
        let frames = adapter().encode_subscribe(&["BTC-USDT".to_string(), "ETH-USDT".to_string()]);
        assert_eq!(
            frames,
            vec![WsMessage::text(
                r#"{"op":"subscribe","args":[{"channel":"tickers","instId":"BTC-USDT"},{"channel":"tickers","instId":"ETH-USDT"}]}"#
            )]
        );
    }

    #[test]
    fn test_unsubscribe_encoding() {
        let frames = adapter().encode_unsubscribe(&["BTC-USDT".to_string()]);
        assert_eq!(
            frames,
            vec![WsMessage::text(
                r#"{"op":"unsubscribe","args":[{"channel":"tickers","instId":"BTC-USDT"}]}"#
            )]
        );
    }

    #[test]
    fn test_decode_subscribe_ack() {
        let frame = WsMessage::text(
            r#"{"event":"subscribe","arg":{"channel":"tickers","instId":"BTC-USDT"},"connId":"a4d3ae55"}"#,
        );
        assert_eq!(
            adapter().decode(&frame).unwrap(),
            Some(Inbound::SubscribeAck("BTC-USDT".to_string()))
        );
    }

    #[test]
    fn test_decode_ticker() {
        let frame = WsMessage::text(
            r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[{"instType":"SPOT","instId":"BTC-USDT","last":"9999.99","lastSz":"0.1","ts":"1597026383085"}]}"#,
        );
        assert_eq!(
            adapter().decode(&frame).unwrap(),
            Some(Inbound::Ticker(Ticker::new(1_597_026_383_085, "BTC-USDT", 9999.99)))
        );
    }

    #[test]
    fn test_decode_pong_error_and_other_channels() {
        let okx = adapter();
        assert_eq!(okx.decode(&WsMessage::text("pong")).unwrap(), None);
        assert_eq!(
            okx.decode(&WsMessage::text(r#"{"event":"error","code":"60012","msg":"Invalid request"}"#))
                .unwrap(),
            None
        );
        assert_eq!(
            okx.decode(&WsMessage::text(
                r#"{"arg":{"channel":"trades","instId":"BTC-USDT"},"data":[{"last":"1","ts":"1"}]}"#
            ))
            .unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_ticker_without_data_is_an_error() {
        let frame = WsMessage::text(r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[]}"#);
        assert!(matches!(
            adapter().decode(&frame),
            Err(ProtocolError::MissingField("data[0]"))
        ));
    }

    #[test]
    fn test_keep_alive_is_active_ping() {
        assert_eq!(
            adapter().keep_alive(),
            KeepAlive::Active {
                idle: Duration::from_secs(25),
                payload: WsMessage::text("ping"),
            }
        );
        let custom = OkxAdapter::new("wss://ws.okx.com:8443/ws/v5/public", Some(Duration::from_secs(10)));
        assert!(matches!(custom.keep_alive(), KeepAlive::Active { idle, .. } if idle == Duration::from_secs(10)));
    }
}
