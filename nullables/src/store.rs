//! Nullable registry: thread-safe in-memory [`OwnershipStore`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use mintgate_store::{OwnershipRecord, OwnershipStore, RegistrySnapshot, StoreError};
use mintgate_types::{TokenId, UserId, WalletAddress};

use crate::{Journal, JournalEntry};

/// In-memory registry with failure injection.
///
/// Snapshots are cloned under the lock, so `get_all` is consistent with
/// respect to concurrent writers.
#[derive(Default)]
pub struct NullOwnershipStore {
    records: Mutex<BTreeMap<TokenId, OwnershipRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    journal: Option<Journal>,
}

impl NullOwnershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Seed a record without counting it as a write.
    pub fn insert(&self, token: &str, owner: &WalletAddress, user: &str) {
        self.records.lock().unwrap().insert(
            TokenId::new(token),
            OwnershipRecord::new(owner.clone(), UserId::new(user)),
        );
    }

    /// Make `get_all` and `get` fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `put`, `delete` and `delete_if` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful `put`, `delete` and removing `delete_if` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&self, token: &str) -> Option<OwnershipRecord> {
        self.records.lock().unwrap().get(&TokenId::new(token)).cloned()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        Ok(())
    }

    fn journal(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

impl OwnershipStore for NullOwnershipStore {
    fn get_all(&self) -> Result<RegistrySnapshot, StoreError> {
        self.check_read()?;
        Ok(self.records.lock().unwrap().clone())
    }

    fn get(&self, token: &TokenId) -> Result<Option<OwnershipRecord>, StoreError> {
        self.check_read()?;
        Ok(self.records.lock().unwrap().get(token).cloned())
    }

    fn put(&self, token: &TokenId, record: &OwnershipRecord) -> Result<(), StoreError> {
        self.check_write()?;
        self.records
            .lock()
            .unwrap()
            .insert(token.clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal(JournalEntry::Put(token.clone()));
        Ok(())
    }

    fn delete(&self, token: &TokenId) -> Result<(), StoreError> {
        self.check_write()?;
        self.records.lock().unwrap().remove(token);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal(JournalEntry::Delete(token.clone()));
        Ok(())
    }

    fn delete_if(&self, token: &TokenId, expected: &OwnershipRecord) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut records = self.records.lock().unwrap();
        if records.get(token) != Some(expected) {
            return Ok(false);
        }
        records.remove(token);
        drop(records);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal(JournalEntry::Delete(token.clone()));
        Ok(true)
    }
}
