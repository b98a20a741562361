//! Nullable ledger: scripted [`LedgerOracle`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mintgate_oracle::{EligibleSet, LedgerOracle, OracleError};
use mintgate_types::{Lamports, Timestamp, TokenId, WalletAddress};

/// A transfer that becomes visible after a number of polls.
struct ScriptedTransfer {
    /// `None` matches any amount.
    amount: Option<Lamports>,
    visible_after_polls: usize,
}

/// Ledger double. Holdings, current owners and incoming transfers are set by
/// the test; every question asked is counted.
#[derive(Default)]
pub struct NullLedger {
    holdings: Mutex<HashMap<WalletAddress, BTreeSet<TokenId>>>,
    owners: Mutex<HashMap<TokenId, WalletAddress>>,
    failing_tokens: Mutex<HashSet<TokenId>>,
    transfers: Mutex<HashMap<WalletAddress, ScriptedTransfer>>,
    polls: Mutex<HashMap<WalletAddress, usize>>,
    last_not_before: Mutex<Option<Timestamp>>,
    failing_polls: AtomicUsize,
    fail_holdings: AtomicBool,
    owner_lookups: AtomicUsize,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// `owner` holds `tokens`, and each of them reports `owner` as current owner.
    pub fn hold(&self, owner: &WalletAddress, tokens: &[&str]) {
        let mut holdings = self.holdings.lock().unwrap();
        let mut owners = self.owners.lock().unwrap();
        let entry = holdings.entry(owner.clone()).or_default();
        for t in tokens {
            entry.insert(TokenId::new(*t));
            owners.insert(TokenId::new(*t), owner.clone());
        }
    }

    /// Move `token` to `new_owner` on chain.
    pub fn transfer_token(&self, token: &str, new_owner: &WalletAddress) {
        let token = TokenId::new(token);
        let mut holdings = self.holdings.lock().unwrap();
        for set in holdings.values_mut() {
            set.remove(&token);
        }
        holdings
            .entry(new_owner.clone())
            .or_default()
            .insert(token.clone());
        self.owners.lock().unwrap().insert(token, new_owner.clone());
    }

    /// `current_owner(token)` fails until cleared.
    pub fn fail_owner_lookup(&self, token: &str) {
        self.failing_tokens.lock().unwrap().insert(TokenId::new(token));
    }

    /// `owned_eligible_tokens` fails while set.
    pub fn fail_holdings(&self, fail: bool) {
        self.fail_holdings.store(fail, Ordering::SeqCst);
    }

    /// The next `n` transfer checks fail with a transient error.
    pub fn fail_next_polls(&self, n: usize) {
        self.failing_polls.store(n, Ordering::SeqCst);
    }

    /// `address` sends itself exactly `amount`, visible from poll number
    /// `after_polls` (1-based) onwards.
    pub fn send_self_transfer(&self, address: &WalletAddress, amount: Lamports, after_polls: usize) {
        self.transfers.lock().unwrap().insert(
            address.clone(),
            ScriptedTransfer {
                amount: Some(amount),
                visible_after_polls: after_polls,
            },
        );
    }

    /// Like [`send_self_transfer`](Self::send_self_transfer) but matching
    /// whatever amount the session asks about.
    pub fn send_matching_transfer(&self, address: &WalletAddress, after_polls: usize) {
        self.transfers.lock().unwrap().insert(
            address.clone(),
            ScriptedTransfer {
                amount: None,
                visible_after_polls: after_polls,
            },
        );
    }

    /// Transfer checks made for `address`, including failed ones.
    pub fn poll_count(&self, address: &WalletAddress) -> usize {
        self.polls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    /// Cutoff passed with the most recent transfer check.
    pub fn last_not_before(&self) -> Option<Timestamp> {
        *self.last_not_before.lock().unwrap()
    }

    pub fn owner_lookups(&self) -> usize {
        self.owner_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerOracle for NullLedger {
    async fn owned_eligible_tokens(
        &self,
        owner: &WalletAddress,
        eligible: &EligibleSet,
    ) -> Result<BTreeSet<TokenId>, OracleError> {
        if self.fail_holdings.load(Ordering::SeqCst) {
            return Err(OracleError::Unreachable("injected failure".into()));
        }
        Ok(self
            .holdings
            .lock()
            .unwrap()
            .get(owner)
            .map(|set| set.iter().filter(|t| eligible.contains(*t)).cloned().collect())
            .unwrap_or_default())
    }

    async fn current_owner(&self, token: &TokenId) -> Result<WalletAddress, OracleError> {
        self.owner_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_tokens.lock().unwrap().contains(token) {
            return Err(OracleError::Unreachable(format!("injected failure for {token}")));
        }
        self.owners
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| OracleError::NotFound(token.to_string()))
    }

    async fn has_transfer_occurred(
        &self,
        address: &WalletAddress,
        amount: Lamports,
        not_before: Timestamp,
    ) -> Result<bool, OracleError> {
        *self.last_not_before.lock().unwrap() = Some(not_before);
        let poll = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(address.clone()).or_default();
            *count += 1;
            *count
        };
        let failing = self.failing_polls.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_polls.store(failing - 1, Ordering::SeqCst);
            return Err(OracleError::Http(502));
        }
        Ok(match self.transfers.lock().unwrap().get(address) {
            Some(t) => poll >= t.visible_after_polls && t.amount.map_or(true, |a| a == amount),
            None => false,
        })
    }
}
