//! Common test utilities for HyperSockets integration tests

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
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

/// In-process echo server
///
/// Text and binary frames come back unchanged. The text frame `"bye"` makes
/// the server send a close frame and hang up.
pub struct MockWsServer {
    pub addr: SocketAddr,
    stop: Arc<Notify>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = Arc::new(Notify::new());

        let accept_stop = stop.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        tokio::spawn(echo(stream, accept_stop.clone()));
                    }
                    _ = accept_stop.notified() => break,
                }
            }
        });

        Self { addr, stop }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

async fn echo(stream: TcpStream, stop: Arc<Notify>) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    loop {
        let frame = tokio::select! {
            frame = read.next() => frame,
            _ = stop.notified() => return,
        };

        match frame {
            Some(Ok(Message::Text(text))) if text == "bye" => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => {
                if write.send(msg).await.is_err() {
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.stop.notify_waiters();
    }
}
