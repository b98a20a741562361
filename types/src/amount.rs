//! Native ledger amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of the ledger's native currency in its smallest unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    /// Smallest units per whole coin.
    pub const PER_SOL: u64 = 1_000_000_000;

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Whole-coin rendering with all nine decimals, e.g. `0.000123456`.
    pub fn to_sol_string(&self) -> String {
        format!("{}.{:09}", self.0 / Self::PER_SOL, self.0 % Self::PER_SOL)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} SOL", self.to_sol_string())
    }
}
