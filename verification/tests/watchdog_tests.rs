//! Reconciliation passes and the periodic watchdog loop.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mintgate_nullables::{NullGateway, NullLedger, NullOwnershipStore};
use mintgate_oracle::{EligibleSet, LedgerOracle, OracleError};
use mintgate_store::OwnershipStore;
use mintgate_types::{Lamports, Timestamp, TokenId, UserId, WalletAddress};
use mintgate_verification::{
    run_pass, run_watchdog, VerifierContext, VerifierSettings, WatchdogError,
};
use tokio::sync::broadcast;

fn addr(byte: u8) -> WalletAddress {
    WalletAddress::from_bytes(&[byte; 32])
}

fn context(
    store: &Arc<NullOwnershipStore>,
    oracle: Arc<dyn LedgerOracle>,
    gateway: &Arc<NullGateway>,
) -> Arc<VerifierContext> {
    Arc::new(VerifierContext::new(
        store.clone(),
        oracle,
        gateway.clone(),
        VerifierSettings::default(),
    ))
}

struct Harness {
    store: Arc<NullOwnershipStore>,
    ledger: Arc<NullLedger>,
    gateway: Arc<NullGateway>,
    ctx: Arc<VerifierContext>,
}

fn harness() -> Harness {
    let store = Arc::new(NullOwnershipStore::new());
    let ledger = Arc::new(NullLedger::new());
    let gateway = Arc::new(NullGateway::new());
    let ctx = context(&store, ledger.clone(), &gateway);
    Harness {
        store,
        ledger,
        gateway,
        ctx,
    }
}

#[tokio::test]
async fn moved_token_is_deleted_and_owner_revoked() {
    let h = harness();
    let (owner_x, owner_y) = (addr(1), addr(2));
    h.store.insert("mintA", &owner_x, "userX");
    h.gateway.give_role("userX");
    h.ledger.hold(&owner_y, &["mintA"]);

    let report = run_pass(&h.ctx).await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.stale.len(), 1);
    assert_eq!(report.stale[0].token, TokenId::new("mintA"));
    assert_eq!(report.stale[0].current_owner, owner_y);
    assert!(h.store.record("mintA").is_none());
    assert_eq!(report.revoked, vec![UserId::new("userX")]);
    assert!(!h.gateway.has_role("userX"));
    assert_eq!(h.gateway.direct_messages().len(), 1);
}

#[tokio::test]
async fn owner_with_another_valid_record_keeps_role() {
    let h = harness();
    let owner_x = addr(1);
    h.store.insert("mintA", &owner_x, "userX");
    h.store.insert("mintB", &owner_x, "userX");
    h.ledger.hold(&owner_x, &["mintB"]);
    h.ledger.hold(&addr(2), &["mintA"]);
    h.gateway.give_role("userX");

    let report = run_pass(&h.ctx).await.unwrap();
    assert_eq!(report.stale.len(), 1);
    assert_eq!(report.retained, vec![UserId::new("userX")]);
    assert!(report.revoked.is_empty());
    assert!(h.gateway.has_role("userX"));
}

#[tokio::test]
async fn second_pass_without_chain_changes_is_a_no_op() {
    let h = harness();
    h.store.insert("m1", &addr(1), "a");
    h.store.insert("m2", &addr(2), "b");
    h.ledger.hold(&addr(1), &["m1"]);
    h.ledger.hold(&addr(3), &["m2"]);

    let first = run_pass(&h.ctx).await.unwrap();
    assert_eq!(first.stale.len(), 1);
    let writes = h.store.write_count();
    let removals = h.gateway.removals().len();

    let second = run_pass(&h.ctx).await.unwrap();
    assert!(second.is_clean());
    assert_eq!(second.checked, 1);
    assert_eq!(h.store.write_count(), writes);
    assert_eq!(h.gateway.removals().len(), removals);
}

#[tokio::test]
async fn failed_lookup_skips_only_that_token() {
    let h = harness();
    h.store.insert("flaky", &addr(1), "a");
    h.store.insert("moved", &addr(1), "a");
    h.store.insert("steady", &addr(2), "b");
    h.ledger.hold(&addr(2), &["steady"]);
    h.ledger.hold(&addr(3), &["moved"]);
    h.ledger.fail_owner_lookup("flaky");

    let report = run_pass(&h.ctx).await.unwrap();
    assert_eq!(report.inconclusive, vec![TokenId::new("flaky")]);
    assert_eq!(report.stale.len(), 1);
    assert!(h.store.record("flaky").is_some());
    assert!(h.store.record("moved").is_none());
    // "a" is still named by the inconclusive record.
    assert_eq!(report.retained, vec![UserId::new("a")]);
    assert_eq!(h.ctx.metrics().inconclusive_lookups.get(), 1);
}

#[tokio::test]
async fn unreadable_registry_skips_the_pass() {
    let h = harness();
    h.store.insert("m1", &addr(1), "a");
    h.store.fail_reads(true);

    let err = run_pass(&h.ctx).await.unwrap_err();
    assert!(matches!(err, WatchdogError::Snapshot(_)));
    assert_eq!(h.ledger.owner_lookups(), 0);
    assert_eq!(h.ctx.metrics().watchdog_skipped_passes.get(), 1);
    assert_eq!(h.ctx.metrics().watchdog_passes.get(), 0);
}

#[tokio::test]
async fn stale_user_revoked_once_for_several_tokens() {
    let h = harness();
    h.store.insert("m1", &addr(1), "a");
    h.store.insert("m2", &addr(1), "a");
    h.ledger.hold(&addr(9), &["m1", "m2"]);

    let report = run_pass(&h.ctx).await.unwrap();
    assert_eq!(report.stale.len(), 2);
    assert_eq!(h.gateway.removals(), vec![UserId::new("a")]);
}

#[tokio::test]
async fn removal_failures_are_reported_per_user() {
    let h = harness();
    h.store.insert("m1", &addr(1), "a");
    h.store.insert("m2", &addr(2), "b");
    h.ledger.hold(&addr(9), &["m1", "m2"]);
    h.gateway.fail_removal_for("a");

    let report = run_pass(&h.ctx).await.unwrap();
    assert_eq!(report.revoked, vec![UserId::new("b")]);
    assert_eq!(report.revocation_failures.len(), 1);
    assert_eq!(report.revocation_failures[0].user, UserId::new("a"));
    assert_eq!(report.revocation_failures[0].tokens, vec![TokenId::new("m1")]);
}

/// Oracle that reports every token as held by one wallet, slowly, and
/// tracks how many lookups overlap.
struct SlowLedger {
    owner: WalletAddress,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl LedgerOracle for SlowLedger {
    async fn owned_eligible_tokens(
        &self,
        _owner: &WalletAddress,
        _eligible: &EligibleSet,
    ) -> Result<BTreeSet<TokenId>, OracleError> {
        Ok(BTreeSet::new())
    }

    async fn current_owner(&self, _token: &TokenId) -> Result<WalletAddress, OracleError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.owner.clone())
    }

    async fn has_transfer_occurred(
        &self,
        _address: &WalletAddress,
        _amount: Lamports,
        _not_before: Timestamp,
    ) -> Result<bool, OracleError> {
        Ok(false)
    }
}

/// Oracle that lets a verification session land between the snapshot and
/// the stale-record delete: the lookup rewrites the record for a new holder
/// and then reports that holder as the owner.
struct ReverifyingLedger {
    store: Arc<NullOwnershipStore>,
    new_owner: WalletAddress,
    new_user: UserId,
}

#[async_trait]
impl LedgerOracle for ReverifyingLedger {
    async fn owned_eligible_tokens(
        &self,
        _owner: &WalletAddress,
        _eligible: &EligibleSet,
    ) -> Result<BTreeSet<TokenId>, OracleError> {
        Ok(BTreeSet::new())
    }

    async fn current_owner(&self, token: &TokenId) -> Result<WalletAddress, OracleError> {
        self.store
            .set(token, &self.new_owner, &self.new_user)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        Ok(self.new_owner.clone())
    }

    async fn has_transfer_occurred(
        &self,
        _address: &WalletAddress,
        _amount: Lamports,
        _not_before: Timestamp,
    ) -> Result<bool, OracleError> {
        Ok(false)
    }
}

#[tokio::test]
async fn record_reverified_during_pass_is_kept() {
    let store = Arc::new(NullOwnershipStore::new());
    store.insert("mintA", &addr(1), "userX");
    let gateway = Arc::new(NullGateway::new());
    gateway.give_role("userX");
    gateway.give_role("userY");
    let ledger = Arc::new(ReverifyingLedger {
        store: store.clone(),
        new_owner: addr(2),
        new_user: UserId::new("userY"),
    });
    let ctx = context(&store, ledger, &gateway);

    let report = run_pass(&ctx).await.unwrap();
    assert!(report.stale.is_empty());
    assert_eq!(report.reverified, vec![TokenId::new("mintA")]);
    assert!(report.revoked.is_empty());

    let record = store.record("mintA").expect("fresh record kept");
    assert_eq!(record.owner_address, addr(2));
    assert_eq!(record.requesting_user, UserId::new("userY"));
    assert!(gateway.removals().is_empty());
    assert!(gateway.has_role("userY"));
    assert_eq!(ctx.metrics().stale_records.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn lookups_respect_fan_out() {
    let store = Arc::new(NullOwnershipStore::new());
    for i in 0..20 {
        store.insert(&format!("m{i}"), &addr(1), "a");
    }
    let ledger = Arc::new(SlowLedger {
        owner: addr(1),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let gateway = Arc::new(NullGateway::new());
    let settings = VerifierSettings {
        watchdog_fan_out: 5,
        ..VerifierSettings::default()
    };
    let ctx = VerifierContext::new(store, ledger.clone(), gateway, settings);

    let report = run_pass(&ctx).await.unwrap();
    assert_eq!(report.checked, 20);
    assert!(report.is_clean());
    assert_eq!(ledger.max_in_flight.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn loop_runs_every_period_and_survives_skipped_passes() {
    let h = harness();
    h.store.insert("m1", &addr(1), "a");
    h.ledger.hold(&addr(1), &["m1"]);

    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(run_watchdog(h.ctx.clone(), rx));
    let period = VerifierSettings::default().watchdog_period;

    // Nothing before the first full period.
    tokio::time::sleep(period - Duration::from_secs(1)).await;
    assert_eq!(h.ctx.metrics().watchdog_passes.get(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.ctx.metrics().watchdog_passes.get(), 1);

    h.store.fail_reads(true);
    tokio::time::sleep(period).await;
    assert_eq!(h.ctx.metrics().watchdog_skipped_passes.get(), 1);

    h.store.fail_reads(false);
    tokio::time::sleep(period).await;
    assert_eq!(h.ctx.metrics().watchdog_passes.get(), 2);

    tx.send(()).unwrap();
    handle.await.unwrap();
}
