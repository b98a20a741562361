use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("chat API unreachable: {0}")]
    Unreachable(String),

    #[error("chat API rate limited, retry after {retry_after_secs:.1}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("chat API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response from chat API: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// The target refuses DMs or the bot lacks permission.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, GatewayError::Http { status: 403, .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            GatewayError::Unreachable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Unreachable(e.to_string())
        }
    }
}
