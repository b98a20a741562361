//! CoinGecko simple-price client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{with_retries, MarketError, PriceFeed, RetryPolicy};

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// USD market data for one coin.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TickerData {
    pub usd: f64,
    #[serde(default)]
    pub usd_market_cap: f64,
    #[serde(default, rename = "usd_24h_vol")]
    pub usd_24h_volume: f64,
    #[serde(default, rename = "usd_24h_change")]
    pub usd_24h_change_pct: f64,
}

pub struct MarketClient {
    http_client: reqwest::Client,
    api_base: String,
    coin_id: String,
    policy: RetryPolicy,
}

impl MarketClient {
    pub fn new(api_base: impl Into<String>, coin_id: impl Into<String>, policy: RetryPolicy) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            coin_id: coin_id.into(),
            policy,
        }
    }

    fn price_url(&self) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_market_cap=true&include_24hr_vol=true&include_24hr_change=true",
            self.api_base, self.coin_id
        )
    }

    /// One attempt, no retry.
    pub async fn fetch(&self) -> Result<TickerData, MarketError> {
        let response = self.http_client.get(self.price_url()).send().await?;
        if !response.status().is_success() {
            return Err(MarketError::Http(response.status().as_u16()));
        }
        let mut by_coin: HashMap<String, TickerData> = response.json().await?;
        by_coin
            .remove(&self.coin_id)
            .ok_or_else(|| MarketError::InvalidResponse(format!("no entry for {}", self.coin_id)))
    }

    /// [`fetch`](Self::fetch) under the configured retry policy.
    pub async fn fetch_with_retries(&self) -> Result<TickerData, MarketError> {
        with_retries(self.policy, |_| self.fetch()).await
    }
}

#[async_trait]
impl PriceFeed for MarketClient {
    async fn ticker(&self) -> Result<TickerData, MarketError> {
        self.fetch_with_retries().await
    }
}
