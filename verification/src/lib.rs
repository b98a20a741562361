//! NFT ownership verification.
//!
//! Three cooperating pieces share one [`VerifierContext`]:
//! 1. **Session**: proves a user controls a wallet holding eligible tokens by
//!    asking them to send themselves a random, exact amount before a deadline.
//! 2. **Revocation**: removes the role from users who no longer appear in any
//!    registry record, notifying them best-effort.
//! 3. **Watchdog**: periodically compares every registry record with the
//!    ledger's current owner and revokes stale grants.
//!
//! Registry writes for a session happen before its role grant, and the grant
//! happens before superseded users are revoked.

pub mod challenge;
pub mod context;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod revocation;
pub mod session;
pub mod state;
pub mod watchdog;

pub use challenge::{
    draw_amount, Challenge, MAX_CHALLENGE_LAMPORTS, MIN_CHALLENGE_LAMPORTS, TRANSFER_CLOCK_SKEW,
};
pub use context::{VerifierContext, VerifierSettings};
pub use error::{ErrorClass, RevocationError, SessionError, WatchdogError};
pub use metrics::VerificationMetrics;
pub use revocation::{revoke_access, RevocationBatch, RevocationFailure, RevocationReport};
pub use session::{Confirmation, VerificationSession};
pub use state::SessionState;
pub use watchdog::{run_pass, run_watchdog, PassReport, StaleRecord};
