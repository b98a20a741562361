//! Daily market report posted at UTC midnight.

use std::sync::Arc;

use mintgate_gateway::{ChannelId, RoleGateway};
use mintgate_market::{format_report, PriceFeed, TokenLabel};
use mintgate_types::Timestamp;
use tokio::sync::broadcast;

/// Source of the current wall-clock time.
pub type WallClock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

pub struct DailyReport {
    prices: Arc<dyn PriceFeed>,
    gateway: Arc<dyn RoleGateway>,
    channel: ChannelId,
    label: TokenLabel,
    clock: WallClock,
}

impl DailyReport {
    pub fn new(
        prices: Arc<dyn PriceFeed>,
        gateway: Arc<dyn RoleGateway>,
        channel: ChannelId,
        label: TokenLabel,
    ) -> Self {
        Self {
            prices,
            gateway,
            channel,
            label,
            clock: Arc::new(Timestamp::now),
        }
    }

    pub fn with_clock(mut self, clock: WallClock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch and post one report. Failures are logged; the next midnight
    /// tries again.
    pub async fn post_once(&self) -> bool {
        let ticker = match self.prices.ticker().await {
            Ok(ticker) => ticker,
            Err(e) => {
                tracing::warn!(error = %e, "market data unavailable, skipping daily report");
                return false;
            }
        };
        let text = format_report(&self.label, &ticker);
        match self.gateway.send_channel_message(&self.channel, &text).await {
            Ok(()) => {
                tracing::info!(channel = %self.channel, "posted daily market report");
                true
            }
            Err(e) => {
                tracing::warn!(channel = %self.channel, error = %e, "failed to post daily market report");
                false
            }
        }
    }

    /// Post at every UTC midnight until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let wait = (self.clock)().until_next_utc_midnight();
            tracing::debug!(
                next_in = %mintgate_utils::format_duration(wait),
                "daily market report scheduled"
            );
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = self.post_once() => {}
            }
        }
        tracing::debug!("daily market report stopped");
    }
}
