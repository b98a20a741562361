//! Market ticker for the community token.
//!
//! Fetches USD price, 24h change and market cap from CoinGecko, retrying a
//! bounded number of times with linear backoff, and renders a short text
//! report for the `/price` command and the daily channel post.

pub mod client;
pub mod error;
pub mod report;
pub mod retry;

use async_trait::async_trait;

pub use client::{MarketClient, TickerData, COINGECKO_API_BASE};
pub use error::MarketError;
pub use report::{format_grouped, format_report, TokenLabel};
pub use retry::{with_retries, RetryPolicy};

/// Source of market data for reports.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Current ticker. Implementations apply their own retry policy.
    async fn ticker(&self) -> Result<TickerData, MarketError>;
}
