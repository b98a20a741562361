//! Fundamental types for mintgate.
//!
//! This crate defines the identifiers shared across every other crate in the
//! workspace: wallet addresses, token (mint) identifiers, chat-platform user
//! ids, lamport amounts and timestamps.

pub mod address;
pub mod amount;
pub mod error;
pub mod time;
pub mod token;
pub mod user;

pub use address::WalletAddress;
pub use amount::Lamports;
pub use error::AddressError;
pub use time::Timestamp;
pub use token::TokenId;
pub use user::UserId;
