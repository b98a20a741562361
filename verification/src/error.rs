use mintgate_gateway::GatewayError;
use mintgate_oracle::OracleError;
use mintgate_store::StoreError;
use mintgate_types::{AddressError, Lamports, WalletAddress};
use thiserror::Error;

use crate::{RevocationFailure, RevocationReport, SessionState};

/// Coarse classification used for logging and user messaging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed user input.
    Input,
    /// Legitimate protocol outcome: nothing eligible, or no transfer in time.
    Negative,
    /// Ledger or chat API failure; the next tick or pass may succeed.
    Transient,
    /// Registry I/O failure.
    Storage,
    /// Some users in a revocation batch kept their role.
    PartialBatch,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("'{input}' is not a valid wallet address: {source}")]
    InvalidAddress {
        input: String,
        #[source]
        source: AddressError,
    },

    #[error("wallet {0} does not own any eligible token")]
    NoEligibleTokens(WalletAddress),

    #[error("no transfer of {amount} from {address} observed before the deadline")]
    TimedOut {
        address: WalletAddress,
        amount: Lamports,
    },

    #[error("ledger lookup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("registry update after confirmed transfer failed: {0}")]
    Registry(#[from] StoreError),

    #[error("role grant after confirmed transfer failed: {0}")]
    RoleGrant(#[source] GatewayError),

    #[error("operation not valid in state {actual} (expected {expected})")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::InvalidAddress { .. } => ErrorClass::Input,
            SessionError::NoEligibleTokens(_) | SessionError::TimedOut { .. } => {
                ErrorClass::Negative
            }
            SessionError::Oracle(_) | SessionError::RoleGrant(_) => ErrorClass::Transient,
            SessionError::Registry(_) => ErrorClass::Storage,
            SessionError::InvalidState { .. } => ErrorClass::Input,
        }
    }

    /// Infrastructure fault, as opposed to a protocol outcome.
    pub fn is_fault(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Transient | ErrorClass::Storage | ErrorClass::PartialBatch
        )
    }

    /// The on-chain proof succeeded and only bookkeeping failed.
    pub fn after_proof(&self) -> bool {
        matches!(self, SessionError::Registry(_) | SessionError::RoleGrant(_))
    }
}

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("registry snapshot for revocation failed: {0}")]
    Snapshot(#[from] StoreError),

    #[error("role removal failed for {} of {attempted} users", failures.len())]
    PartialBatch {
        attempted: usize,
        /// Outcome for the users that did not fail.
        report: RevocationReport,
        failures: Vec<RevocationFailure>,
    },
}

impl RevocationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RevocationError::Snapshot(_) => ErrorClass::Storage,
            RevocationError::PartialBatch { .. } => ErrorClass::PartialBatch,
        }
    }
}

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("registry snapshot failed, skipping pass: {0}")]
    Snapshot(#[from] StoreError),
}
