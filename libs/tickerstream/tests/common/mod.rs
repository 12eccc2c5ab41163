//! Common test utilities for TickerStream integration tests

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// In-process server speaking the Binance mini-ticker protocol
///
/// On every `SUBSCRIBE` it acknowledges the request, sends a `ping` and then
/// one mini-ticker per subscribed symbol for each timestamp in `timestamps`.
/// All text frames received and connection closes are recorded.
pub struct MockBinanceServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<Notify>,
}

impl MockBinanceServer {
    pub async fn start(timestamps: Vec<i64>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(Notify::new());

        let received_clone = received.clone();
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let received = received_clone.clone();
                        let timestamps = timestamps.clone();
                        tokio::spawn(Self::handle_connection(stream, received, timestamps));
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            received,
            shutdown,
        }
    }

    async fn handle_connection(stream: TcpStream, received: Arc<Mutex<Vec<String>>>, timestamps: Vec<i64>) {
        let Ok(ws_stream) = accept_async(stream).await else {
            return;
        };
        let (mut write, mut read) = ws_stream.split();

        while let Some(Ok(msg)) = read.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            received.lock().push(text.clone());

            let Ok(request) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            if request["method"] != "SUBSCRIBE" {
                continue;
            }

            let reply = format!(r#"{{"result":null,"id":{}}}"#, request["id"]);
            if write.send(Message::Text(reply)).await.is_err() {
                break;
            }
            if write.send(Message::Text("ping".to_string())).await.is_err() {
                break;
            }

            let symbols: Vec<String> = request["params"]
                .as_array()
                .map(|params| {
                    params
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|p| p.split('@').next())
                        .map(str::to_uppercase)
                        .collect()
                })
                .unwrap_or_default();

            for ts in &timestamps {
                for symbol in &symbols {
                    let tick = format!(
                        r#"{{"e":"24hrMiniTicker","E":{},"s":"{}","c":"100.5","o":"1","h":"1","l":"1","v":"1","q":"1"}}"#,
                        ts, symbol
                    );
                    if write.send(Message::Text(tick)).await.is_err() {
                        return;
                    }
                }
            }
        }

        received.lock().push("<closed>".to_string());
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Wait until a received frame satisfies `predicate`
    pub async fn wait_for(&self, predicate: impl Fn(&str) -> bool) -> bool {
        for _ in 0..200 {
            if self.received.lock().iter().any(|frame| predicate(frame)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }
}

impl Drop for MockBinanceServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}
