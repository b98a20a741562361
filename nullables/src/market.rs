//! Nullable price feed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mintgate_market::{MarketError, PriceFeed, TickerData};

/// Returns a fixed ticker, or an exhausted-retries error when none is set.
#[derive(Default)]
pub struct NullPriceFeed {
    ticker: Mutex<Option<TickerData>>,
    calls: AtomicUsize,
}

impl NullPriceFeed {
    pub fn new(ticker: TickerData) -> Self {
        Self {
            ticker: Mutex::new(Some(ticker)),
            calls: AtomicUsize::new(0),
        }
    }

    /// A feed whose every call fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, ticker: Option<TickerData>) {
        *self.ticker.lock().unwrap() = ticker;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for NullPriceFeed {
    async fn ticker(&self) -> Result<TickerData, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ticker
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MarketError::Exhausted {
                attempts: 1,
                last: Box::new(MarketError::Http(503)),
            })
    }
}
