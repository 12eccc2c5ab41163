//! End-to-end tests: Dispatcher -> Connection -> hypersockets -> mock exchange

mod common;

use common::MockBinanceServer;
use futures::StreamExt;
use std::time::Duration;
use tickerstream::{Dispatcher, Exchange, FeedConfig};
use tokio::time::timeout;

fn config_for(server: &MockBinanceServer) -> FeedConfig {
    let mut config = FeedConfig::default();
    config.exchanges.binance.url = server.ws_url();
    config
}

#[tokio::test]
async fn test_ticks_flow_through_rate_filter() {
    let server = MockBinanceServer::start(vec![0, 100, 400, 500, 1000]).await;
    let dispatcher = Dispatcher::new(config_for(&server)).unwrap();

    let stream = dispatcher.watch("ba", "btcusdt", 500).unwrap();
    let timestamps: Vec<i64> = timeout(
        Duration::from_secs(5),
        stream.take(3).map(|ticker| ticker.timestamp).collect::<Vec<_>>(),
    )
    .await
    .expect("timed out waiting for ticks");
    verbose_println!("  Received {:?}", timestamps);

    assert_eq!(timestamps, vec![0, 500, 1000]);

    let received = server.received();
    assert_eq!(
        received[0],
        r#"{"method":"SUBSCRIBE","params":["btcusdt@miniTicker"],"id":1}"#
    );
    assert!(server.wait_for(|frame| frame == "pong").await, "ping was not answered");
}

#[tokio::test]
async fn test_two_consumers_share_one_subscription() {
    let server = MockBinanceServer::start(vec![1, 2, 3]).await;
    let dispatcher = Dispatcher::new(config_for(&server)).unwrap();

    let first = dispatcher.watch("ba", "ETHUSDT", 0).unwrap();
    let second = dispatcher.watch("ba", "ethusdt", 0).unwrap();

    let (a, b) = timeout(Duration::from_secs(5), async {
        let a: Vec<i64> = first.take(3).map(|t| t.timestamp).collect().await;
        let b: Vec<i64> = second.take(3).map(|t| t.timestamp).collect().await;
        (a, b)
    })
    .await
    .expect("timed out waiting for ticks");

    assert_eq!(a, vec![1, 2, 3]);
    assert_eq!(a, b);

    let subscribes = server
        .received()
        .iter()
        .filter(|frame| frame.contains("\"SUBSCRIBE\""))
        .count();
    assert_eq!(subscribes, 1);
}

#[tokio::test]
async fn test_idle_consumer_is_unsubscribed_and_transport_closed() {
    let server = MockBinanceServer::start(vec![1]).await;
    let mut config = config_for(&server);
    config.timing.sweep_interval_ms = 50;
    config.timing.watching_idle_ms = 100;
    config.timing.connection_idle_ms = 100;
    let dispatcher = Dispatcher::new(config).unwrap();

    let mut stream = dispatcher.watch("ba", "BTCUSDT", 0).unwrap();
    let first = timeout(Duration::from_secs(5), stream.next()).await.unwrap();
    assert_eq!(first.map(|t| t.symbol), Some("BTCUSDT".to_string()));
    drop(stream);

    assert!(
        server.wait_for(|frame| frame.contains("\"UNSUBSCRIBE\"")).await,
        "no unsubscribe sent"
    );
    assert!(server.wait_for(|frame| frame == "<closed>").await, "transport not closed");

    let connection = dispatcher.connection(Exchange::Binance).unwrap();
    for _ in 0..100 {
        if !connection.snapshot().has_transport {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let snapshot = connection.snapshot();
    assert!(!snapshot.has_transport);
    assert!(!snapshot.ready);
    assert!(snapshot.entries.is_empty());
}

#[tokio::test]
async fn test_unreachable_exchange_yields_no_ticks() {
    let mut config = FeedConfig::default();
    config.exchanges.binance.url = "ws://127.0.0.1:1".to_string();
    let dispatcher = Dispatcher::new(config).unwrap();

    let mut stream = dispatcher.watch("ba", "BTCUSDT", 0).unwrap();
    assert!(timeout(Duration::from_millis(300), stream.next()).await.is_err());

    let connection = dispatcher.connection(Exchange::Binance).unwrap();
    for _ in 0..100 {
        if !connection.snapshot().has_transport {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let snapshot = connection.snapshot();
    assert!(!snapshot.has_transport);
    assert_eq!(snapshot.entries.len(), 1);
}
