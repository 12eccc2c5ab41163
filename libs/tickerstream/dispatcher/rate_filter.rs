use crate::connection::TickerStream;
use futures::{future, StreamExt};

/// Per-consumer throttle on tick timestamps
///
/// The first tick always passes; later ticks pass once at least
/// `rate_millis` have elapsed (in exchange time) since the last one that
/// passed. A rate of zero passes everything.
#[derive(Debug, Clone)]
pub struct RateFilter {
    rate_millis: i64,
    last_passed: Option<i64>,
}

impl RateFilter {
    pub fn new(rate_millis: u64) -> Self {
        Self {
            rate_millis: i64::try_from(rate_millis).unwrap_or(i64::MAX),
            last_passed: None,
        }
    }

    pub fn admit(&mut self, timestamp: i64) -> bool {
        let pass = match self.last_passed {
            None => true,
            Some(_) if self.rate_millis == 0 => true,
            Some(last) => timestamp.saturating_sub(last) >= self.rate_millis,
        };
        if pass {
            self.last_passed = Some(timestamp);
        }
        pass
    }
}

/// Wrap `stream` in a [`RateFilter`]
pub fn rate_limited(stream: TickerStream, rate_millis: u64) -> TickerStream {
    if rate_millis == 0 {
        return stream;
    }

    let mut filter = RateFilter::new(rate_millis);
    Box::pin(stream.filter(move |ticker| future::ready(filter.admit(ticker.timestamp))))
}
