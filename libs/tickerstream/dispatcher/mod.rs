//! Routes watch requests to per-exchange connections

mod rate_filter;

pub use rate_filter::{rate_limited, RateFilter};

use crate::config::FeedConfig;
use crate::connection::{Connection, Connector, TickerStream, WsConnector};
use crate::domain::Exchange;
use crate::error::Result;
use crate::protocol::adapter_for;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Entry point for consumers
///
/// Holds at most one [`Connection`] per exchange, created on first demand and
/// kept for the dispatcher's lifetime.
pub struct Dispatcher {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<Exchange, Arc<Connection>>>,
}

impl Dispatcher {
    /// Dispatcher talking to the real exchanges
    pub fn new(config: FeedConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(WsConnector::default()))
    }

    /// Fails with [`FeedError::Config`](crate::FeedError::Config) when `config` does not validate
    pub fn with_connector(config: FeedConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connector,
            connections: RwLock::new(HashMap::new()),
        })
    }

    /// Stream of ticks for `symbol` on the exchange with code `exchange_code`
    ///
    /// `rate_millis` throttles this consumer only (0 disables throttling).
    /// Must be called from within a tokio runtime.
    pub fn watch(&self, exchange_code: &str, symbol: &str, rate_millis: u64) -> Result<TickerStream> {
        let exchange: Exchange = exchange_code.parse()?;
        let connection = self.connection_or_create(exchange)?;
        let stream = connection.watch(symbol)?;
        Ok(rate_limited(stream, rate_millis))
    }

    /// Existing connection for `exchange`, if any consumer ever asked for it
    pub fn connection(&self, exchange: Exchange) -> Option<Arc<Connection>> {
        self.connections.read().get(&exchange).cloned()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    fn connection_or_create(&self, exchange: Exchange) -> Result<Arc<Connection>> {
        if let Some(connection) = self.connection(exchange) {
            return Ok(connection);
        }

        let mut connections = self.connections.write();
        if let Some(connection) = connections.get(&exchange) {
            return Ok(Arc::clone(connection));
        }

        let adapter = adapter_for(exchange, self.config.exchanges.get(exchange));
        let connection = Connection::spawn(adapter, Arc::clone(&self.connector), &self.config)?;
        info!("[{} WS] Connection created", exchange.name());

        connections.insert(exchange, Arc::clone(&connection));
        Ok(connection)
    }
}
