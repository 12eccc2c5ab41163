use crate::domain::{Ticker, WatchState};
use futures::stream::{self, Stream};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::debug;

/// Consumer side of one symbol subscription
///
/// Ends when the connection drops the symbol's entry. Dropping the stream
/// detaches the consumer.
pub type TickerStream = Pin<Box<dyn Stream<Item = Ticker> + Send>>;

/// Per-symbol state inside a connection registry
pub(crate) struct SubscriptionEntry {
    pub(crate) symbol: String,
    pub(crate) state: WatchState,
    last_touch: Instant,
    sender: broadcast::Sender<Ticker>,
}

impl SubscriptionEntry {
    pub(crate) fn new(symbol: String, state: WatchState, capacity: usize, now: Instant) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            symbol,
            state,
            last_touch: now,
            sender,
        }
    }

    /// Attached consumers
    pub(crate) fn observers(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_touch = now;
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touch)
    }

    /// Move to `state`, restarting the idle clock
    pub(crate) fn transition(&mut self, state: WatchState, now: Instant) {
        if self.state != state {
            debug!("{}: {} -> {}", self.symbol, self.state, state);
            self.state = state;
        }
        self.last_touch = now;
    }

    /// Push a tick to every attached consumer
    ///
    /// Returns false without buffering anything when nobody listens.
    pub(crate) fn publish(&mut self, ticker: Ticker, now: Instant) -> bool {
        if self.observers() == 0 {
            return false;
        }
        self.last_touch = now;
        self.sender.send(ticker).is_ok()
    }

    /// Attach a new consumer
    pub(crate) fn attach(&mut self, now: Instant) -> TickerStream {
        self.last_touch = now;
        ticker_stream(self.sender.subscribe())
    }
}

fn ticker_stream(receiver: broadcast::Receiver<Ticker>) -> TickerStream {
    Box::pin(stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(ticker) => return Some((ticker, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Consumer lagged, skipped {} ticks", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }))
}
