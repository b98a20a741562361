//! Verification session lifecycle.

use std::fmt;

/// ```text
/// AwaitingAddress -> AddressValidated -> ChallengeIssued -> Confirmed
///        |                  |                  |-> TimedOut
///        '------------------'------------------'-> Failed
/// ```
/// `Confirmed` may still end in `Failed` if bookkeeping after the proof
/// fails; the proof itself is never retracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    AwaitingAddress,
    AddressValidated,
    ChallengeIssued,
    Confirmed,
    TimedOut,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Confirmed | SessionState::TimedOut | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingAddress => "awaiting-address",
            SessionState::AddressValidated => "address-validated",
            SessionState::ChallengeIssued => "challenge-issued",
            SessionState::Confirmed => "confirmed",
            SessionState::TimedOut => "timed-out",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
