use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("invalid request signature")]
    BadSignature,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed interaction: {0}")]
    Malformed(String),
}

impl IntoResponse for InteractionError {
    fn into_response(self) -> Response {
        let status = match &self {
            InteractionError::MissingHeader(_) | InteractionError::BadSignature => {
                StatusCode::UNAUTHORIZED
            }
            InteractionError::Malformed(_) => StatusCode::BAD_REQUEST,
            InteractionError::InvalidPublicKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
