//! One multiplexed streaming connection per exchange
//!
//! A [`Connection`] owns a single transport and a registry of per-symbol
//! subscription entries. Consumers attach through [`Connection::watch`];
//! a driver task feeds transport events into [`Connection::handle_event`] and
//! runs [`Connection::check_idle`] on a fixed interval.

mod entry;
#[cfg(test)]
pub(crate) mod mock;
pub mod transport;

pub use entry::TickerStream;
pub use transport::{Connector, EventSink, TransportEvent, TransportLink, WsConnector};

use crate::config::{FeedConfig, TimingConfig};
use crate::domain::{Exchange, WatchState};
use crate::error::Result;
use crate::protocol::{Inbound, KeepAlive, ProtocolAdapter};
use entry::SubscriptionEntry;
use hypersockets::{ClientEvent, HyperSocketError, WsMessage};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Point-in-time view of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub symbol: String,
    pub state: WatchState,
    pub observers: usize,
}

/// Point-in-time view of a connection, entries sorted by symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub ready: bool,
    pub has_transport: bool,
    pub entries: Vec<EntrySnapshot>,
}

struct Registry {
    /// `ready` implies `link.is_some()`
    link: Option<Box<dyn TransportLink>>,
    generation: u64,
    ready: bool,
    /// Last inbound frame or keep-alive sent
    last_touch: Instant,
    /// Set while the registry has been empty with a transport open
    empty_since: Option<Instant>,
    entries: HashMap<String, SubscriptionEntry>,
}

pub struct Connection {
    exchange: Exchange,
    adapter: Arc<dyn ProtocolAdapter>,
    connector: Arc<dyn Connector>,
    keep_alive: KeepAlive,
    timing: TimingConfig,
    channel_capacity: usize,
    sink: EventSink,
    registry: Mutex<Registry>,
}

impl Connection {
    /// Build a connection without a driver
    ///
    /// The caller is responsible for feeding the returned receiver into
    /// [`handle_event`](Self::handle_event) and calling
    /// [`check_idle`](Self::check_idle) periodically; [`spawn`](Self::spawn)
    /// does both.
    pub fn new(
        adapter: Arc<dyn ProtocolAdapter>,
        connector: Arc<dyn Connector>,
        config: &FeedConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (sink, events) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            exchange: adapter.exchange(),
            keep_alive: adapter.keep_alive(),
            adapter,
            connector,
            timing: config.timing.clone(),
            channel_capacity: config.channel_capacity,
            sink,
            registry: Mutex::new(Registry {
                link: None,
                generation: 0,
                ready: false,
                last_touch: Instant::now(),
                empty_since: None,
                entries: HashMap::new(),
            }),
        });
        (connection, events)
    }

    /// Build a connection and start its driver on the current runtime
    pub fn spawn(
        adapter: Arc<dyn ProtocolAdapter>,
        connector: Arc<dyn Connector>,
        config: &FeedConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HyperSocketError::NoRuntime(e.to_string()))?;

        let (connection, events) = Self::new(adapter, connector, config);
        runtime.spawn(drive(
            Arc::downgrade(&connection),
            events,
            connection.timing.sweep_interval(),
        ));

        Ok(connection)
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Attach a consumer to `symbol`
    ///
    /// Creates the entry on first demand and opens the transport when none is
    /// open. Never waits for the network.
    pub fn watch(&self, symbol: &str) -> Result<TickerStream> {
        let symbol = self.adapter.normalize_symbol(symbol);
        let now = Instant::now();

        let mut guard = self.registry.lock();
        let reg = &mut *guard;

        if reg.link.is_none() {
            self.open_link(reg, now)?;
        }

        let entry = match reg.entries.entry(symbol) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let state = if reg.ready {
                    WatchState::Subscribing
                } else {
                    WatchState::Waiting
                };
                debug!("[{} WS] New entry {} ({})", self.exchange.name(), vacant.key(), state);

                if reg.ready {
                    let frames = self.adapter.encode_subscribe(&[vacant.key().clone()]);
                    send_frames(self.exchange, reg.link.as_deref(), frames);
                }

                let symbol = vacant.key().clone();
                vacant.insert(SubscriptionEntry::new(symbol, state, self.channel_capacity, now))
            }
        };

        let stream = entry.attach(now);
        reg.empty_since = None;

        Ok(stream)
    }

    /// Apply one transport event
    pub fn handle_event(&self, event: TransportEvent) {
        let now = Instant::now();
        let mut guard = self.registry.lock();
        let reg = &mut *guard;

        if event.generation != reg.generation {
            debug!(
                "[{} WS] Ignoring {:?} from stale transport #{} (current #{})",
                self.exchange.name(),
                event.kind,
                event.generation,
                reg.generation
            );
            return;
        }

        match event.kind {
            ClientEvent::Connected => self.on_open(reg, now),
            ClientEvent::Message(frame) => self.on_message(reg, frame, now),
            ClientEvent::Error(e) => {
                error!("[{} WS] Transport error: {}", self.exchange.name(), e);
            }
            ClientEvent::Disconnected => self.on_close(reg),
        }
    }

    /// Periodic sweep over the registry
    ///
    /// Unsubscribes idle and unconfirmed entries in one batch and drops
    /// orphaned waiting entries. Also closes the transport once the registry
    /// has stayed empty, and sends the adapter's keep-alive on a silent line.
    pub fn check_idle(&self) {
        let now = Instant::now();
        let mut guard = self.registry.lock();
        let reg = &mut *guard;
        let name = self.exchange.name();

        let mut expired = Vec::new();
        let mut orphaned = Vec::new();

        for (symbol, entry) in reg.entries.iter_mut() {
            let observers = entry.observers();
            match entry.state {
                WatchState::Watching => {
                    if observers > 0 {
                        entry.touch(now);
                    } else if entry.idle_for(now) > self.timing.watching_idle() {
                        debug!("[{} WS] {} unobserved for {:?}", name, symbol, entry.idle_for(now));
                        expired.push(symbol.clone());
                    }
                }
                WatchState::Subscribing => {
                    if !reg.ready {
                        entry.transition(WatchState::Waiting, now);
                    } else if entry.idle_for(now) > self.timing.subscribe_timeout() {
                        warn!(
                            "[{} WS] No confirmation for {} after {:?}, giving up",
                            name,
                            symbol,
                            entry.idle_for(now)
                        );
                        expired.push(symbol.clone());
                    }
                }
                WatchState::Waiting => {
                    if observers > 0 {
                        entry.touch(now);
                    } else if entry.idle_for(now) > self.timing.watching_idle() {
                        orphaned.push(symbol.clone());
                    }
                }
            }
        }

        if !expired.is_empty() {
            expired.sort();
            for symbol in &expired {
                reg.entries.remove(symbol);
            }
            if reg.ready {
                let frames = self.adapter.encode_unsubscribe(&expired);
                send_frames(self.exchange, reg.link.as_deref(), frames);
            }
            info!("[{} WS] Unsubscribed from {} symbol(s): {:?}", name, expired.len(), expired);
        }

        for symbol in &orphaned {
            reg.entries.remove(symbol);
            debug!("[{} WS] Dropped waiting entry {}", name, symbol);
        }

        self.check_connection_idle(reg, now);
        self.check_keep_alive(reg, now);
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        let reg = self.registry.lock();
        let mut entries: Vec<EntrySnapshot> = reg
            .entries
            .values()
            .map(|entry| EntrySnapshot {
                symbol: entry.symbol.clone(),
                state: entry.state,
                observers: entry.observers(),
            })
            .collect();
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        ConnectionSnapshot {
            ready: reg.ready,
            has_transport: reg.link.is_some(),
            entries,
        }
    }

    fn open_link(&self, reg: &mut Registry, now: Instant) -> Result<()> {
        let generation = reg.generation + 1;
        info!(
            "[{} WS] Opening transport #{} to {}",
            self.exchange.name(),
            generation,
            self.adapter.url()
        );

        let link = self
            .connector
            .open(self.adapter.url(), generation, self.sink.clone())?;

        reg.link = Some(link);
        reg.generation = generation;
        reg.ready = false;
        reg.last_touch = now;
        Ok(())
    }

    fn on_open(&self, reg: &mut Registry, now: Instant) {
        if reg.link.is_none() {
            return;
        }

        reg.ready = true;
        reg.last_touch = now;

        let mut waiting: Vec<String> = reg
            .entries
            .values_mut()
            .filter(|entry| entry.state == WatchState::Waiting)
            .map(|entry| {
                entry.transition(WatchState::Subscribing, now);
                entry.symbol.clone()
            })
            .collect();
        waiting.sort();

        info!(
            "[{} WS] Transport #{} ready, subscribing {} symbol(s)",
            self.exchange.name(),
            reg.generation,
            waiting.len()
        );

        let frames = self.adapter.encode_subscribe(&waiting);
        send_frames(self.exchange, reg.link.as_deref(), frames);
    }

    fn on_close(&self, reg: &mut Registry) {
        if reg.link.take().is_some() || reg.ready {
            info!("[{} WS] Transport #{} closed", self.exchange.name(), reg.generation);
        }
        reg.ready = false;

        let now = Instant::now();
        for entry in reg.entries.values_mut() {
            entry.transition(WatchState::Waiting, now);
        }
    }

    fn on_message(&self, reg: &mut Registry, frame: WsMessage, now: Instant) {
        reg.last_touch = now;

        let inbound = match self.adapter.decode(&frame) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return,
            Err(e) => {
                warn!("[{} WS] Dropping frame: {}", self.exchange.name(), e);
                return;
            }
        };

        match inbound {
            Inbound::KeepAliveRequest(reply) => {
                debug!("[{} WS] Answering keep-alive", self.exchange.name());
                send_frames(self.exchange, reg.link.as_deref(), vec![reply]);
            }
            Inbound::SubscribeAck(symbol) => {
                if let Some(entry) = reg.entries.get_mut(&symbol) {
                    if entry.state == WatchState::Subscribing {
                        entry.transition(WatchState::Watching, now);
                    }
                }
            }
            Inbound::Ticker(ticker) => {
                if let Some(entry) = reg.entries.get_mut(&ticker.symbol) {
                    if entry.state == WatchState::Subscribing {
                        entry.transition(WatchState::Watching, now);
                    }
                    entry.publish(ticker, now);
                }
            }
        }
    }

    fn check_connection_idle(&self, reg: &mut Registry, now: Instant) {
        if !reg.entries.is_empty() || reg.link.is_none() {
            reg.empty_since = None;
            return;
        }

        match reg.empty_since {
            None => reg.empty_since = Some(now),
            Some(since) if now.saturating_duration_since(since) > self.timing.connection_idle() => {
                info!(
                    "[{} WS] No subscriptions for {:?}, closing transport #{}",
                    self.exchange.name(),
                    now.saturating_duration_since(since),
                    reg.generation
                );
                if let Some(link) = reg.link.take() {
                    link.close();
                }
                reg.ready = false;
                reg.empty_since = None;
            }
            Some(_) => {}
        }
    }

    fn check_keep_alive(&self, reg: &mut Registry, now: Instant) {
        if let KeepAlive::Active { idle, payload } = &self.keep_alive {
            if reg.ready && now.saturating_duration_since(reg.last_touch) > *idle {
                debug!("[{} WS] Line silent, sending keep-alive", self.exchange.name());
                send_frames(self.exchange, reg.link.as_deref(), vec![payload.clone()]);
                reg.last_touch = now;
            }
        }
    }
}

fn send_frames(exchange: Exchange, link: Option<&dyn TransportLink>, frames: Vec<WsMessage>) {
    let Some(link) = link else {
        return;
    };
    for frame in frames {
        debug!("[{} WS] >> {:?}", exchange.name(), frame);
        if let Err(e) = link.send(frame) {
            warn!("[{} WS] Failed to send frame: {}", exchange.name(), e);
        }
    }
}

/// Driver loop: serialises transport events and periodic sweeps
///
/// Stops once the connection has been dropped.
async fn drive(
    connection: Weak<Connection>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    sweep_interval: Duration,
) {
    let mut sweep = tokio::time::interval(sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
    sweep.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Some(connection) = connection.upgrade() else { break };
                connection.handle_event(event);
            }
            _ = sweep.tick() => {
                let Some(connection) = connection.upgrade() else { break };
                connection.check_idle();
            }
        }
    }

    debug!("Connection driver stopped");
}
