//! Shared ordered log of side effects.

use std::sync::{Arc, Mutex};

use mintgate_types::{TokenId, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    Put(TokenId),
    Delete(TokenId),
    Grant(UserId),
    Remove(UserId),
    DirectMessage(UserId),
}

#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: JournalEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &JournalEntry) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }
}
