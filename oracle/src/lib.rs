//! Ledger oracle: what the chain currently says about wallets and tokens.
//!
//! The core never talks to the ledger directly. It asks three questions
//! through [`LedgerOracle`]:
//! - which eligible tokens does this wallet hold?
//! - who holds this token right now?
//! - has this wallet sent itself exactly this amount since a given time?
//!
//! All three are pure queries and safe to repeat. A failure means "no answer
//! this attempt", never a negative answer.

pub mod error;
pub mod rpc;
pub mod solana;

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use mintgate_types::{Lamports, Timestamp, TokenId, WalletAddress};

pub use error::OracleError;
pub use solana::SolanaRpcOracle;

/// Allow-listed token ids that qualify a wallet for the role.
pub type EligibleSet = HashSet<TokenId>;

#[async_trait]
pub trait LedgerOracle: Send + Sync {
    /// Tokens from `eligible` currently held by `owner`.
    async fn owned_eligible_tokens(
        &self,
        owner: &WalletAddress,
        eligible: &EligibleSet,
    ) -> Result<BTreeSet<TokenId>, OracleError>;

    /// Wallet currently holding `token`.
    async fn current_owner(&self, token: &TokenId) -> Result<WalletAddress, OracleError>;

    /// Whether `address` sent exactly `amount` to itself in a successful
    /// transaction with block time at or after `not_before`.
    async fn has_transfer_occurred(
        &self,
        address: &WalletAddress,
        amount: Lamports,
        not_before: Timestamp,
    ) -> Result<bool, OracleError>;
}
