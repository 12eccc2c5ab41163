//! CLI utilities for binaries
//!
//! Handles configuration loading and argument parsing
//! for all binary executables.

use anyhow::{bail, Context};
use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Feed configuration (feed_config.yaml)
    Feed,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Feed => "config/feed_config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Feed => "FEED_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use ticker_feed::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Feed);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

pub const WATCH_USAGE: &str = "usage: watch_ticker <ba|oe|hb> <symbol> [rate_ms]";

/// Arguments of `watch_ticker`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchArgs {
    pub exchange: String,
    pub symbol: String,
    pub rate_millis: u64,
}

impl WatchArgs {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let (exchange, symbol, rate) = match args {
            [exchange, symbol] => (exchange, symbol, None),
            [exchange, symbol, rate] => (exchange, symbol, Some(rate)),
            _ => bail!(WATCH_USAGE),
        };

        let rate_millis = match rate {
            Some(rate) => rate
                .parse()
                .with_context(|| format!("rate_ms must be a non-negative integer, got {}", rate))?,
            None => 0,
        };

        Ok(Self {
            exchange: exchange.clone(),
            symbol: symbol.clone(),
            rate_millis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Feed.default_path(), "config/feed_config.yaml");

        let custom = ConfigType::Custom("custom/path.yaml".to_string());
        assert_eq!(custom.default_path(), "custom/path.yaml");
    }

    #[test]
    fn test_config_type_env_vars() {
        assert_eq!(ConfigType::Feed.env_var_name(), "FEED_CONFIG_PATH");
        assert_eq!(ConfigType::Custom("x".into()).env_var_name(), "CONFIG_PATH");
    }

    #[test]
    fn test_watch_args() {
        assert_eq!(
            WatchArgs::parse(&args(&["ba", "BTCUSDT"])).unwrap(),
            WatchArgs {
                exchange: "ba".into(),
                symbol: "BTCUSDT".into(),
                rate_millis: 0,
            }
        );
        assert_eq!(WatchArgs::parse(&args(&["oe", "BTC-USDT", "250"])).unwrap().rate_millis, 250);
        assert!(WatchArgs::parse(&args(&["ba"])).is_err());
        assert!(WatchArgs::parse(&args(&["ba", "BTCUSDT", "-1"])).is_err());
        assert!(WatchArgs::parse(&args(&["ba", "BTCUSDT", "1", "2"])).is_err());
    }
}
