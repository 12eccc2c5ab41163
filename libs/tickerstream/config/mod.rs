use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::Exchange;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Ticker feed configuration
///
/// Every field has a default, so an empty YAML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-symbol broadcast buffer; slow consumers skip ticks beyond it
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub exchanges: ExchangesConfig,
}

/// Sweep and idle thresholds, all in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_watching_idle")]
    pub watching_idle_ms: u64,
    #[serde(default = "default_subscribe_timeout")]
    pub subscribe_timeout_ms: u64,
    #[serde(default = "default_connection_idle")]
    pub connection_idle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangesConfig {
    #[serde(default = "default_binance")]
    pub binance: ExchangeConfig,
    #[serde(default = "default_okx")]
    pub okx: ExchangeConfig,
    #[serde(default = "default_huobi")]
    pub huobi: ExchangeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub url: String,
    /// Silence before the client pings
    ///
    /// Only OKX reads it. Binance and Huobi ping the client themselves, so a
    /// value set for them is ignored and reported by [`FeedConfig::log`].
    #[serde(default)]
    pub keepalive_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_capacity() -> usize {
    64
}

fn default_sweep_interval() -> u64 {
    2000
}

fn default_watching_idle() -> u64 {
    3000
}

fn default_subscribe_timeout() -> u64 {
    10_000
}

fn default_connection_idle() -> u64 {
    5000
}

fn default_binance() -> ExchangeConfig {
    ExchangeConfig {
        url: "wss://stream.binance.com:9443/ws".to_string(),
        keepalive_secs: None,
    }
}

fn default_okx() -> ExchangeConfig {
    ExchangeConfig {
        url: "wss://ws.okx.com:8443/ws/v5/public".to_string(),
        keepalive_secs: Some(25),
    }
}

fn default_huobi() -> ExchangeConfig {
    ExchangeConfig {
        url: "wss://api.huobi.pro/ws".to_string(),
        keepalive_secs: None,
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval(),
            watching_idle_ms: default_watching_idle(),
            subscribe_timeout_ms: default_subscribe_timeout(),
            connection_idle_ms: default_connection_idle(),
        }
    }
}

impl TimingConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn watching_idle(&self) -> Duration {
        Duration::from_millis(self.watching_idle_ms)
    }

    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.subscribe_timeout_ms)
    }

    pub fn connection_idle(&self) -> Duration {
        Duration::from_millis(self.connection_idle_ms)
    }
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            binance: default_binance(),
            okx: default_okx(),
            huobi: default_huobi(),
        }
    }
}

impl ExchangesConfig {
    pub fn get(&self, exchange: Exchange) -> &ExchangeConfig {
        match exchange {
            Exchange::Binance => &self.binance,
            Exchange::Okx => &self.okx,
            Exchange::Huobi => &self.huobi,
        }
    }

    fn get_mut(&mut self, exchange: Exchange) -> &mut ExchangeConfig {
        match exchange {
            Exchange::Binance => &mut self.binance,
            Exchange::Okx => &mut self.okx,
            Exchange::Huobi => &mut self.huobi,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            channel_capacity: default_channel_capacity(),
            timing: TimingConfig::default(),
            exchanges: ExchangesConfig::default(),
        }
    }
}

/// Environment variable overriding the endpoint of `exchange`
pub fn url_env_var(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Binance => "BINANCE_WS_URL",
        Exchange::Okx => "OKX_WS_URL",
        Exchange::Huobi => "HUOBI_WS_URL",
    }
}

impl FeedConfig {
    /// Load configuration from YAML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;

        for exchange in Exchange::all() {
            if let Ok(url) = std::env::var(url_env_var(*exchange)) {
                info!("Overriding {} URL from environment variable", exchange);
                config.exchanges.get_mut(*exchange).url = url;
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration without touching the environment
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document parses as null rather than an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }

        let timings = [
            ("sweep_interval_ms", self.timing.sweep_interval_ms),
            ("watching_idle_ms", self.timing.watching_idle_ms),
            ("subscribe_timeout_ms", self.timing.subscribe_timeout_ms),
            ("connection_idle_ms", self.timing.connection_idle_ms),
        ];
        for (name, value) in timings {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "timing.{} must be greater than 0",
                    name
                )));
            }
        }

        for exchange in Exchange::all() {
            let exchange_config = self.exchanges.get(*exchange);
            let url = &exchange_config.url;
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::ValidationError(format!(
                    "{} url must start with ws:// or wss://, got {}",
                    exchange.name(),
                    url
                )));
            }
            if exchange_config.keepalive_secs == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "{} keepalive_secs must be greater than 0",
                    exchange.name()
                )));
            }
        }

        Ok(())
    }

    /// Exchanges with a `keepalive_secs` that has no effect
    pub fn ignored_keepalives(&self) -> Vec<Exchange> {
        Exchange::all()
            .iter()
            .copied()
            .filter(|exchange| !exchange.client_pings())
            .filter(|exchange| self.exchanges.get(*exchange).keepalive_secs.is_some())
            .collect()
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Log level: {}", self.log_level);
        info!("  Channel capacity: {}", self.channel_capacity);
        info!(
            "  Sweep: every {}ms (watching idle {}ms, subscribe timeout {}ms, connection idle {}ms)",
            self.timing.sweep_interval_ms,
            self.timing.watching_idle_ms,
            self.timing.subscribe_timeout_ms,
            self.timing.connection_idle_ms
        );
        for exchange in Exchange::all() {
            let exchange_config = self.exchanges.get(*exchange);
            match exchange_config.keepalive_secs {
                Some(secs) => info!(
                    "  {} ({}): {} (keep-alive {}s)",
                    exchange.name(),
                    exchange.code(),
                    exchange_config.url,
                    secs
                ),
                None => info!("  {} ({}): {}", exchange.name(), exchange.code(), exchange_config.url),
            }
        }
        for exchange in self.ignored_keepalives() {
            warn!(
                "  {} keepalive_secs is ignored: the server sends the pings",
                exchange.name()
            );
        }
    }
}
