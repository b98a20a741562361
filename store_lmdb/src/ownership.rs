//! LMDB implementation of OwnershipStore.
//!
//! Keys are the token id text, values the JSON-encoded record. Every write
//! is its own committed transaction, so a returned `Ok` is durable.

use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env};

use mintgate_store::{OwnershipRecord, OwnershipStore, RegistrySnapshot, StoreError};
use mintgate_types::TokenId;

use crate::LmdbError;

#[derive(Clone)]
pub struct LmdbOwnershipStore {
    pub(crate) env: Arc<Env>,
    pub(crate) ownership_db: Database<Str, Bytes>,
}

fn decode(key: &str, bytes: &[u8]) -> Result<OwnershipRecord, LmdbError> {
    OwnershipRecord::from_bytes(bytes)
        .map_err(|e| LmdbError::Corruption(format!("record for mint {key}: {e}")))
}

impl OwnershipStore for LmdbOwnershipStore {
    fn get_all(&self) -> Result<RegistrySnapshot, StoreError> {
        // A single read transaction is an MVCC snapshot: concurrent writers
        // commit into a newer version that this scan never sees.
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.ownership_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut out = RegistrySnapshot::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            out.insert(TokenId::new(key), decode(key, val)?);
        }
        Ok(out)
    }

    fn get(&self, token: &TokenId) -> Result<Option<OwnershipRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .ownership_db
            .get(&rtxn, token.as_str())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => Ok(Some(decode(token.as_str(), bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, token: &TokenId, record: &OwnershipRecord) -> Result<(), StoreError> {
        let bytes = record.to_bytes()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.ownership_db
            .put(&mut wtxn, token.as_str(), bytes.as_slice())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&self, token: &TokenId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.ownership_db
            .delete(&mut wtxn, token.as_str())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_if(&self, token: &TokenId, expected: &OwnershipRecord) -> Result<bool, StoreError> {
        // LMDB allows one writer at a time, so no upsert can land between
        // the comparison and the delete.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = match self
            .ownership_db
            .get(&wtxn, token.as_str())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Some(decode(token.as_str(), bytes)?),
            None => None,
        };
        if current.as_ref() != Some(expected) {
            // Dropping the uncommitted txn aborts it.
            return Ok(false);
        }
        self.ownership_db
            .delete(&mut wtxn, token.as_str())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.ownership_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
