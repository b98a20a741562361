use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("price API request failed: {0}")]
    Request(String),

    #[error("price API returned HTTP status {0}")]
    Http(u16),

    #[error("invalid price API response: {0}")]
    InvalidResponse(String),

    #[error("price unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<MarketError> },
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MarketError::InvalidResponse(e.to_string())
        } else {
            MarketError::Request(e.to_string())
        }
    }
}
