use thiserror::Error;

/// Why a user-supplied string is not a wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address is not valid base58: {0}")]
    NotBase58(String),

    #[error("address decodes to {0} bytes, expected 32")]
    WrongLength(usize),
}
