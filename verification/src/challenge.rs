//! Custody challenge: a one-time exact self-transfer amount.

use std::time::Duration;

use mintgate_types::{Lamports, Timestamp, WalletAddress};
use rand::Rng;
use tokio::time::Instant;

/// Smallest challenge amount (0.00001 SOL).
pub const MIN_CHALLENGE_LAMPORTS: u64 = 10_000;

/// Largest challenge amount (just under 0.001 SOL).
pub const MAX_CHALLENGE_LAMPORTS: u64 = 999_999;

/// How far the host clock may run ahead of the cluster's block times.
pub const TRANSFER_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Uniform draw from `[MIN_CHALLENGE_LAMPORTS, MAX_CHALLENGE_LAMPORTS]`.
pub fn draw_amount<R: Rng + ?Sized>(rng: &mut R) -> Lamports {
    Lamports::new(rng.gen_range(MIN_CHALLENGE_LAMPORTS..=MAX_CHALLENGE_LAMPORTS))
}

/// An issued challenge.
#[derive(Clone, Debug)]
pub struct Challenge {
    /// Source and destination of the expected transfer.
    pub address: WalletAddress,
    pub amount: Lamports,
    /// Host time at issuance.
    pub issued_at: Timestamp,
    /// Wall-clock deadline, shown to the user.
    pub expires_at: Timestamp,
    /// Monotonic deadline that bounds polling.
    pub deadline: Instant,
}

impl Challenge {
    /// Earliest block time a matching transfer may carry. Block times come
    /// from the cluster, not this host, so issuance is widened by
    /// [`TRANSFER_CLOCK_SKEW`].
    pub fn not_before(&self) -> Timestamp {
        self.issued_at.saturating_sub(TRANSFER_CLOCK_SKEW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintgate_nullables::NullRandom;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    proptest! {
        #[test]
        fn amount_always_in_range(seed in any::<u64>()) {
            let amount = draw_amount(&mut StdRng::seed_from_u64(seed));
            prop_assert!(amount.raw() >= MIN_CHALLENGE_LAMPORTS);
            prop_assert!(amount.raw() <= MAX_CHALLENGE_LAMPORTS);
        }
    }

    #[test]
    fn transfers_slightly_before_issuance_still_count() {
        let challenge = Challenge {
            address: WalletAddress::from_bytes(&[1; 32]),
            amount: Lamports::new(MIN_CHALLENGE_LAMPORTS),
            issued_at: Timestamp::from_secs(10_000),
            expires_at: Timestamp::from_secs(10_600),
            deadline: Instant::now(),
        };
        assert_eq!(challenge.not_before(), Timestamp::from_secs(9_940));
    }

    #[test]
    fn deterministic_for_fixed_source() {
        let a = draw_amount(&mut NullRandom::seeded(7));
        let b = draw_amount(&mut NullRandom::seeded(7));
        assert_eq!(a, b);
    }

    #[test]
    fn nullable_source_finishes_from_any_seed() {
        for seed in [0, 1, u64::MAX, u64::MAX - 1, 1 << 63] {
            let amount = draw_amount(&mut NullRandom::seeded(seed));
            assert!(amount.raw() >= MIN_CHALLENGE_LAMPORTS);
            assert!(amount.raw() <= MAX_CHALLENGE_LAMPORTS);
        }
    }
}
