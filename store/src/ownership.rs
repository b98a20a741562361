//! Ownership registry: token id -> last verified owner.

use std::collections::BTreeMap;

use mintgate_types::{Timestamp, TokenId, UserId, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Last proven owner of one token.
///
/// Stored as JSON. Fields added later must carry `#[serde(default)]` so that
/// older records keep decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    #[serde(rename = "ownerAddress")]
    pub owner_address: WalletAddress,

    #[serde(rename = "requestingUserId")]
    pub requesting_user: UserId,

    /// When the custody proof was accepted.
    #[serde(rename = "verifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<Timestamp>,
}

impl OwnershipRecord {
    pub fn new(owner_address: WalletAddress, requesting_user: UserId) -> Self {
        Self {
            owner_address,
            requesting_user,
            verified_at: Some(Timestamp::now()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Consistent full view of the registry, ordered by token id.
pub type RegistrySnapshot = BTreeMap<TokenId, OwnershipRecord>;

/// Registry operations.
///
/// Implementations must be safe for concurrent point writes and must serve
/// [`get_all`](Self::get_all) from a single consistent view: a snapshot never
/// mixes states from before and after a concurrent write, and never contains
/// partially decoded records.
pub trait OwnershipStore: Send + Sync {
    /// Full snapshot of every tracked token.
    fn get_all(&self) -> Result<RegistrySnapshot, StoreError>;

    /// Point lookup. An unknown token is `Ok(None)`.
    fn get(&self, token: &TokenId) -> Result<Option<OwnershipRecord>, StoreError>;

    /// Upsert, last writer wins. Durable once this returns.
    fn put(&self, token: &TokenId, record: &OwnershipRecord) -> Result<(), StoreError>;

    /// Remove a record. Deleting an unknown token succeeds.
    fn delete(&self, token: &TokenId) -> Result<(), StoreError>;

    /// Remove a record only if it still equals `expected`, atomically with
    /// respect to concurrent writes. Returns whether it was removed.
    fn delete_if(&self, token: &TokenId, expected: &OwnershipRecord) -> Result<bool, StoreError>;

    /// Upsert a freshly verified owner.
    fn set(
        &self,
        token: &TokenId,
        owner: &WalletAddress,
        user: &UserId,
    ) -> Result<(), StoreError> {
        self.put(token, &OwnershipRecord::new(owner.clone(), user.clone()))
    }

    /// Number of tracked tokens.
    fn count(&self) -> Result<u64, StoreError> {
        self.get_all().map(|all| all.len() as u64)
    }
}
