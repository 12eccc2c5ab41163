//! Watch a live ticker stream
//!
//! Usage:
//!   cargo run --bin watch_ticker -- <ba|oe|hb> <symbol> [rate_ms]
//!
//! Examples:
//!   cargo run --bin watch_ticker -- ba BTCUSDT 1000
//!   cargo run --bin watch_ticker -- oe BTC-USDT

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use ticker_feed::bin_common::{load_config_from_env, parse_args, ConfigType, WatchArgs};
use ticker_feed::tickerstream::{init_tracing, Dispatcher, FeedConfig};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = WatchArgs::parse(&parse_args())?;

    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Feed);
    let config = FeedConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let dispatcher = Dispatcher::new(config)?;
    let mut ticks = dispatcher.watch(&args.exchange, &args.symbol, args.rate_millis)?;

    print_banner(&args);

    let mut count = 0u64;
    loop {
        tokio::select! {
            tick = ticks.next() => {
                let Some(ticker) = tick else {
                    warn!("Stream for {} ended", args.symbol);
                    break;
                };
                count += 1;
                let latency_ms = Utc::now().timestamp_millis() - ticker.timestamp;
                let time = DateTime::<Utc>::from_timestamp_millis(ticker.timestamp)
                    .map(|t| t.format("%H:%M:%S%.3f").to_string())
                    .unwrap_or_else(|| ticker.timestamp.to_string());
                info!(
                    "{} {:<12} {:>16} (latency {}ms)",
                    time, ticker.symbol, ticker.price, latency_ms
                );
            }
            _ = signal::ctrl_c() => {
                info!("");
                info!("Received shutdown signal (Ctrl+C)");
                break;
            }
        }
    }

    info!("========================================");
    info!("watch_ticker stopped gracefully");
    info!("Ticks received: {}", count);
    info!("========================================");

    Ok(())
}

fn print_banner(args: &WatchArgs) {
    info!("");
    info!("========================================");
    info!("Watching {} on {}", args.symbol, args.exchange);
    if args.rate_millis > 0 {
        info!("At most one tick every {}ms", args.rate_millis);
    }
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}
