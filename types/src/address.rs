//! Ledger wallet address (base58-encoded 32-byte public key).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AddressError;

/// A wallet address on the ledger.
///
/// Only constructed through [`WalletAddress::parse`], so every value in the
/// system is known to decode to exactly 32 bytes. The canonical base58 text is
/// kept so that comparisons against RPC payloads are plain string equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Length of the decoded public key.
    pub const BYTES: usize = 32;

    /// Parse user input (surrounding whitespace is ignored).
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| AddressError::NotBase58(e.to_string()))?;
        if bytes.len() != Self::BYTES {
            return Err(AddressError::WrongLength(bytes.len()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build an address from raw key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<WalletAddress> for String {
    fn from(addr: WalletAddress) -> Self {
        addr.0
    }
}
