//! Nullable random: deterministic [`RngCore`] for challenge amounts.

use rand::RngCore;

/// Odd increment that spreads successive words over the whole `u64` range.
const WEYL_STEP: u64 = 0x9e37_79b9_7f4a_7c15;

/// Returns pre-configured words in order.
///
/// Range sampling rejects some words and draws again, so a source that can
/// only repeat one word may never produce a value. [`seeded`](Self::seeded)
/// moves on after every word; [`new`](Self::new) cycles exactly and is only
/// safe with words the caller knows are accepted.
pub struct NullRandom {
    outputs: Vec<u64>,
    index: usize,
    step: u64,
}

impl NullRandom {
    pub fn new(outputs: Vec<u64>) -> Self {
        assert!(!outputs.is_empty(), "NullRandom needs at least one output");
        Self {
            outputs,
            index: 0,
            step: 0,
        }
    }

    /// Deterministic sequence starting at `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            outputs: vec![seed],
            index: 0,
            step: WEYL_STEP,
        }
    }

    fn next(&mut self) -> u64 {
        let len = self.outputs.len();
        let round = (self.index / len) as u64;
        let value = self.outputs[self.index % len].wrapping_add(round.wrapping_mul(self.step));
        self.index += 1;
        value
    }
}

impl RngCore for NullRandom {
    fn next_u32(&mut self) -> u32 {
        self.next() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
