use thiserror::Error;

/// Oracle failures. All of them are transient from the caller's point of
/// view: the question may be asked again on the next tick or pass.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("ledger RPC unreachable: {0}")]
    Unreachable(String),

    #[error("ledger RPC returned HTTP status {0}")]
    Http(u16),

    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response from ledger RPC: {0}")]
    InvalidResponse(String),

    #[error("not found on ledger: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OracleError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            OracleError::Unreachable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            OracleError::InvalidResponse(e.to_string())
        } else {
            OracleError::Unreachable(e.to_string())
        }
    }
}
