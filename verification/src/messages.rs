//! User-facing texts.

use std::time::Duration;

use mintgate_types::WalletAddress;
use mintgate_utils::format_duration;

use crate::{Challenge, SessionError};

pub fn challenge_prompt(challenge: &Challenge, token_count: usize, deadline: Duration) -> String {
    let noun = if token_count == 1 { "token" } else { "tokens" };
    format!(
        "Found {token_count} eligible {noun} in `{addr}`.\n\
         To prove you control this wallet, send exactly **{amount} SOL** \
         from `{addr}` to the same address `{addr}`.\n\
         You have {window} (until <t:{expires}:T>). I'll let you know as soon as the transfer lands.",
        addr = challenge.address,
        amount = challenge.amount.to_sol_string(),
        window = format_duration(deadline),
        expires = challenge.expires_at.as_secs(),
    )
}

pub fn verified(address: &WalletAddress, token_count: usize) -> String {
    format!(
        "Transfer received. `{address}` is verified for {token_count} token(s) and your holder role has been granted."
    )
}

pub fn revoked() -> String {
    "Your holder role was removed because the wallet you verified no longer holds an eligible token. \
     Run /verify again from a wallet that does."
        .to_string()
}

/// Text for a session that ended without a role grant.
pub fn for_error(err: &SessionError) -> String {
    match err {
        SessionError::InvalidAddress { input, .. } => {
            format!("`{input}` is not a valid wallet address. Check it and run /verify again.")
        }
        SessionError::NoEligibleTokens(address) => {
            format!("`{address}` does not own any eligible token.")
        }
        SessionError::TimedOut { .. } => {
            "The transfer was not seen before the deadline. Run /verify again to get a new amount."
                .to_string()
        }
        SessionError::Oracle(_) => {
            "The ledger could not be reached right now. Please try /verify again in a few minutes."
                .to_string()
        }
        SessionError::Registry(_) | SessionError::RoleGrant(_) => {
            "Your transfer was received and your wallet ownership is proven, but assigning the role \
             failed. A moderator needs to finish this manually; please contact one."
                .to_string()
        }
        SessionError::InvalidState { .. } => {
            "Something went wrong on our side. Please run /verify again.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintgate_store::StoreError;
    use mintgate_types::{Lamports, Timestamp};
    use tokio::time::Instant;

    #[test]
    fn prompt_mentions_amount_and_count() {
        let challenge = Challenge {
            address: WalletAddress::from_bytes(&[3; 32]),
            amount: Lamports::new(123_456),
            issued_at: Timestamp::from_secs(1_000),
            expires_at: Timestamp::from_secs(1_600),
            deadline: Instant::now(),
        };
        let text = challenge_prompt(&challenge, 2, Duration::from_secs(600));
        assert!(text.contains("Found 2 eligible tokens"));
        assert!(text.contains("**0.000123456 SOL**"));
        assert!(text.contains("10m"));
        assert!(text.contains("<t:1600:T>"));
    }

    #[test]
    fn bookkeeping_message_does_not_claim_failed_proof() {
        let text = for_error(&SessionError::Registry(StoreError::Backend("x".into())));
        assert!(text.contains("ownership is proven"));
        assert!(text.contains("manually"));
    }
}
