//! Text rendering of market data.

use serde::{Deserialize, Serialize};

use crate::TickerData;

/// How the token is named in reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenLabel {
    /// Project name, e.g. `Only1`.
    pub name: String,
    /// Ticker symbol without `$`, e.g. `LIKE`.
    pub symbol: String,
}

impl Default for TokenLabel {
    fn default() -> Self {
        Self {
            name: "Only1".into(),
            symbol: "LIKE".into(),
        }
    }
}

/// `1234567.891` -> `1,234,567.89`. Negative values keep their sign.
pub fn format_grouped(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Short multi-line report. Prices under one cent keep six decimals so
/// they do not render as zero.
pub fn format_report(label: &TokenLabel, ticker: &TickerData) -> String {
    let price = if ticker.usd.abs() < 0.01 {
        format!("{:.6}", ticker.usd)
    } else {
        format_grouped(ticker.usd)
    };
    [
        format!("**{} ({}) price now**", label.name, label.symbol),
        format!("Current price: {} USD per ${} token", price, label.symbol),
        format!("24h change: {}%", format_grouped(ticker.usd_24h_change_pct)),
        format!("Market cap: {} USD", format_grouped(ticker.usd_market_cap)),
        "Source: CoinGecko".to_string(),
    ]
    .join("\n")
}
