//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency (registry, ledger, chat gateway, interaction
//! replies, price feed, randomness) sits behind a trait. This
//! crate provides in-memory implementations that:
//! - return scripted values
//! - can be made to fail on demand
//! - record what was asked of them
//! - never touch the filesystem or network
//!
//! Doubles that share a [`Journal`] append to one ordered log, which lets
//! tests assert cross-component ordering (registry write before role grant).

pub mod gateway;
pub mod journal;
pub mod ledger;
pub mod market;
pub mod random;
pub mod store;

pub use gateway::{NullGateway, NullResponder};
pub use journal::{Journal, JournalEntry};
pub use ledger::NullLedger;
pub use market::NullPriceFeed;
pub use random::NullRandom;
pub use store::NullOwnershipStore;
