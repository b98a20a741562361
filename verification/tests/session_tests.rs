//! End-to-end verification sessions against nullable infrastructure.
//!
//! Time is paused, so the ten-minute deadline elapses instantly once every
//! task is idle.

use std::sync::Arc;
use std::time::Duration;

use mintgate_nullables::{
    Journal, JournalEntry, NullGateway, NullLedger, NullOwnershipStore, NullRandom, NullResponder,
};
use mintgate_oracle::EligibleSet;
use mintgate_store::OwnershipStore;
use mintgate_types::{Lamports, TokenId, UserId, WalletAddress};
use mintgate_verification::{
    draw_amount, SessionError, SessionState, VerificationSession, VerifierContext,
    VerifierSettings, TRANSFER_CLOCK_SKEW,
};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<NullOwnershipStore>,
    ledger: Arc<NullLedger>,
    gateway: Arc<NullGateway>,
    journal: Journal,
    ctx: Arc<VerifierContext>,
}

const RNG_SEED: u64 = 0x5eed;

fn harness() -> Harness {
    let journal = Journal::new();
    let store = Arc::new(NullOwnershipStore::with_journal(journal.clone()));
    let ledger = Arc::new(NullLedger::new());
    let gateway = Arc::new(NullGateway::with_journal(journal.clone()));
    let eligible: EligibleSet = ["m1", "m2", "m3", "m4"].into_iter().map(TokenId::from).collect();
    let settings = VerifierSettings {
        eligible,
        ..VerifierSettings::default()
    };
    let ctx = VerifierContext::new(store.clone(), ledger.clone(), gateway.clone(), settings)
        .with_rng(NullRandom::seeded(RNG_SEED));
    Harness {
        store,
        ledger,
        gateway,
        journal,
        ctx: Arc::new(ctx),
    }
}

fn addr(byte: u8) -> WalletAddress {
    WalletAddress::from_bytes(&[byte; 32])
}

fn expected_amount() -> Lamports {
    draw_amount(&mut NullRandom::seeded(RNG_SEED))
}

async fn verify(h: &Harness, user: &str, address: &WalletAddress) -> Result<(), SessionError> {
    let responder = NullResponder::new();
    VerificationSession::run(h.ctx.clone(), UserId::new(user), address.as_str(), &responder)
        .await
        .map(|_| ())
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn matching_transfer_confirms_and_records_every_candidate() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1", "m2", "not-eligible"]);
    h.ledger.send_self_transfer(&wallet, expected_amount(), 3);

    let responder = NullResponder::new();
    let confirmation =
        VerificationSession::run(h.ctx.clone(), UserId::new("alice"), wallet.as_str(), &responder)
            .await
            .unwrap();

    assert_eq!(confirmation.tokens.len(), 2);
    for mint in ["m1", "m2"] {
        let record = h.store.record(mint).unwrap();
        assert_eq!(record.owner_address, wallet);
        assert_eq!(record.requesting_user, UserId::new("alice"));
        assert!(record.verified_at.is_some());
    }
    assert!(h.store.record("not-eligible").is_none());
    assert!(h.gateway.has_role("alice"));

    let edits = responder.edits();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].contains("Found 2 eligible tokens"));
    assert!(edits[0].contains(&expected_amount().to_sol_string()));
    let follow_ups = responder.follow_ups();
    assert_eq!(follow_ups.len(), 1);
    assert!(follow_ups[0].contains("verified"));

    assert_eq!(h.ledger.poll_count(&wallet), 3);
    assert_eq!(h.ctx.metrics().sessions_confirmed.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_at_first_match() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);

    let started = Instant::now();
    verify(&h, "alice", &wallet).await.unwrap();
    assert_eq!(h.ledger.poll_count(&wallet), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(h.ledger.poll_count(&wallet), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_checks_are_retried_on_the_next_tick() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);
    h.ledger.fail_next_polls(2);

    verify(&h, "alice", &wallet).await.unwrap();
    assert_eq!(h.ledger.poll_count(&wallet), 3);
    assert!(h.gateway.has_role("alice"));
}

#[tokio::test(start_paused = true)]
async fn step_api_walks_the_state_machine() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);

    let mut session = VerificationSession::new(h.ctx.clone(), UserId::new("alice"));
    assert_eq!(session.state(), SessionState::AwaitingAddress);

    // Out-of-order steps are rejected without changing state.
    let err = session.await_transfer().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
    assert_eq!(session.state(), SessionState::AwaitingAddress);

    session.validate_address(&format!("  {wallet} ")).unwrap();
    assert_eq!(session.state(), SessionState::AddressValidated);
    session.issue_challenge().await.unwrap();
    assert_eq!(session.state(), SessionState::ChallengeIssued);
    let challenge = session.challenge().unwrap();
    assert_eq!(challenge.amount, expected_amount());
    assert_eq!(
        challenge.expires_at.as_secs() - challenge.issued_at.as_secs(),
        600
    );
    let issued_at = challenge.issued_at;
    session.await_transfer().await.unwrap();
    assert_eq!(session.state(), SessionState::Confirmed);
    assert_eq!(
        h.ledger.last_not_before(),
        Some(issued_at.saturating_sub(TRANSFER_CLOCK_SKEW))
    );
    session.finalize().await.unwrap();
    assert_eq!(session.state(), SessionState::Confirmed);
}

// ---------------------------------------------------------------------------
// Negative outcomes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn malformed_address_fails_without_ledger_calls() {
    let h = harness();
    let responder = NullResponder::new();
    let err = VerificationSession::run(h.ctx.clone(), UserId::new("alice"), "not-an-address", &responder)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidAddress { .. }));
    assert!(!err.is_fault());
    assert!(responder.edits()[0].contains("not-an-address"));
    assert!(responder.follow_ups().is_empty());
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn wallet_without_eligible_tokens_is_a_negative_result() {
    let h = harness();
    let wallet = addr(2);
    h.ledger.hold(&wallet, &["random-nft"]);
    let responder = NullResponder::new();
    let err = VerificationSession::run(h.ctx.clone(), UserId::new("bob"), wallet.as_str(), &responder)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::NoEligibleTokens(_)));
    assert!(!err.is_fault());
    assert!(responder.edits()[0].contains("does not own any eligible token"));
    assert_eq!(h.ledger.poll_count(&wallet), 0);
}

#[tokio::test(start_paused = true)]
async fn ledger_outage_before_challenge_is_a_fault() {
    let h = harness();
    h.ledger.fail_holdings(true);
    let err = verify(&h, "bob", &addr(2)).await.unwrap_err();
    assert!(matches!(err, SessionError::Oracle(_)));
    assert!(err.is_fault());
    assert!(!err.after_proof());
}

#[tokio::test(start_paused = true)]
async fn no_transfer_before_deadline_times_out_without_side_effects() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);

    let started = Instant::now();
    let mut session = VerificationSession::new(h.ctx.clone(), UserId::new("alice"));
    session.validate_address(wallet.as_str()).unwrap();
    session.issue_challenge().await.unwrap();
    let err = session.await_transfer().await.unwrap_err();

    assert!(matches!(err, SessionError::TimedOut { .. }));
    assert_eq!(session.state(), SessionState::TimedOut);
    assert_eq!(started.elapsed(), Duration::from_secs(600));
    assert!(h.ledger.poll_count(&wallet) >= 199);
    assert_eq!(h.store.write_count(), 0);
    assert!(h.gateway.grants().is_empty());

    // The poll loop is gone: no further ledger traffic after the deadline.
    let polls = h.ledger.poll_count(&wallet);
    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(h.ledger.poll_count(&wallet), polls);

    // Finalizing a timed-out session is refused.
    assert!(matches!(
        session.finalize().await,
        Err(SessionError::InvalidState { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn wrong_amount_does_not_count() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger
        .send_self_transfer(&wallet, Lamports::new(expected_amount().raw() + 1), 1);

    let responder = NullResponder::new();
    let err = VerificationSession::run(h.ctx.clone(), UserId::new("alice"), wallet.as_str(), &responder)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::TimedOut { .. }));
    assert!(responder.follow_ups()[0].contains("not seen before the deadline"));
    assert!(h.store.is_empty());
    assert_eq!(h.ctx.metrics().sessions_timed_out.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn aborted_session_has_no_effects() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);

    let ctx = h.ctx.clone();
    let address = wallet.to_string();
    let task = tokio::spawn(async move {
        let responder = NullResponder::new();
        VerificationSession::run(ctx, UserId::new("alice"), &address, &responder).await
    });
    tokio::time::sleep(Duration::from_secs(10)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    h.ledger.send_matching_transfer(&wallet, 1);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.store.is_empty());
    assert!(h.gateway.grants().is_empty());
}

// ---------------------------------------------------------------------------
// Bookkeeping after a confirmed proof
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn registry_failure_after_proof_asks_for_manual_follow_up() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);
    h.store.fail_writes(true);

    let responder = NullResponder::new();
    let err = VerificationSession::run(h.ctx.clone(), UserId::new("alice"), wallet.as_str(), &responder)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Registry(_)));
    assert!(err.after_proof());
    assert!(h.gateway.grants().is_empty());
    let text = responder.last_message().unwrap();
    assert!(text.contains("ownership is proven"));
    assert!(!text.contains("not seen"));
    assert_eq!(h.ctx.metrics().bookkeeping_failures.get(), 1);
    assert_eq!(h.ctx.metrics().sessions_confirmed.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn role_grant_failure_keeps_records() {
    let h = harness();
    let wallet = addr(1);
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);
    h.gateway.fail_grants(true);

    let err = verify(&h, "alice", &wallet).await.unwrap_err();
    assert!(matches!(err, SessionError::RoleGrant(_)));
    assert!(err.after_proof());
    assert!(h.store.record("m1").is_some());
}

// ---------------------------------------------------------------------------
// Supersession
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn previous_holder_without_other_records_loses_role() {
    let h = harness();
    let (old_wallet, new_wallet) = (addr(1), addr(2));
    h.store.insert("m1", &old_wallet, "alice");
    h.gateway.give_role("alice");
    h.ledger.hold(&new_wallet, &["m1"]);
    h.ledger.send_matching_transfer(&new_wallet, 1);

    let responder = NullResponder::new();
    let confirmation =
        VerificationSession::run(h.ctx.clone(), UserId::new("bob"), new_wallet.as_str(), &responder)
            .await
            .unwrap();

    assert_eq!(confirmation.superseded, vec![UserId::new("alice")]);
    assert_eq!(confirmation.revoked, vec![UserId::new("alice")]);
    assert_eq!(h.store.record("m1").unwrap().requesting_user, UserId::new("bob"));
    assert!(h.gateway.has_role("bob"));
    assert!(!h.gateway.has_role("alice"));
    assert_eq!(h.gateway.direct_messages()[0].0, UserId::new("alice"));
}

#[tokio::test(start_paused = true)]
async fn previous_holder_with_another_record_keeps_role() {
    let h = harness();
    let (old_wallet, new_wallet) = (addr(1), addr(2));
    h.store.insert("m1", &old_wallet, "alice");
    h.store.insert("m3", &old_wallet, "alice");
    h.gateway.give_role("alice");
    h.ledger.hold(&new_wallet, &["m1"]);
    h.ledger.send_matching_transfer(&new_wallet, 1);

    let confirmation = {
        let responder = NullResponder::new();
        VerificationSession::run(h.ctx.clone(), UserId::new("bob"), new_wallet.as_str(), &responder)
            .await
            .unwrap()
    };

    assert_eq!(confirmation.superseded, vec![UserId::new("alice")]);
    assert!(confirmation.revoked.is_empty());
    assert!(h.gateway.has_role("alice"));
    assert!(h.gateway.removals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn partial_revocation_still_reports_removed_users() {
    let h = harness();
    let new_wallet = addr(3);
    h.store.insert("m1", &addr(1), "alice");
    h.store.insert("m2", &addr(2), "carol");
    h.gateway.give_role("alice");
    h.gateway.give_role("carol");
    h.gateway.fail_removal_for("alice");
    h.ledger.hold(&new_wallet, &["m1", "m2"]);
    h.ledger.send_matching_transfer(&new_wallet, 1);

    let responder = NullResponder::new();
    let confirmation =
        VerificationSession::run(h.ctx.clone(), UserId::new("bob"), new_wallet.as_str(), &responder)
            .await
            .unwrap();

    assert_eq!(
        confirmation.superseded,
        vec![UserId::new("alice"), UserId::new("carol")]
    );
    assert_eq!(confirmation.revoked, vec![UserId::new("carol")]);
    assert!(h.gateway.has_role("alice"));
    assert!(!h.gateway.has_role("carol"));
}

#[tokio::test(start_paused = true)]
async fn same_user_from_new_wallet_is_not_superseded() {
    let h = harness();
    let (old_wallet, new_wallet) = (addr(1), addr(2));
    h.store.insert("m1", &old_wallet, "alice");
    h.ledger.hold(&new_wallet, &["m1"]);
    h.ledger.send_matching_transfer(&new_wallet, 1);

    verify(&h, "alice", &new_wallet).await.unwrap();
    assert!(h.gateway.removals().is_empty());
    assert_eq!(h.store.record("m1").unwrap().owner_address, new_wallet);
}

#[tokio::test(start_paused = true)]
async fn another_user_on_the_same_wallet_is_not_superseded() {
    let h = harness();
    let wallet = addr(1);
    h.store.insert("m1", &wallet, "alice");
    h.ledger.hold(&wallet, &["m1"]);
    h.ledger.send_matching_transfer(&wallet, 1);

    verify(&h, "bob", &wallet).await.unwrap();
    assert!(h.gateway.removals().is_empty());
    assert_eq!(h.store.record("m1").unwrap().requesting_user, UserId::new("bob"));
}

#[tokio::test(start_paused = true)]
async fn writes_happen_before_grant_before_revocation() {
    let h = harness();
    let (old_wallet, new_wallet) = (addr(1), addr(2));
    h.store.insert("m1", &old_wallet, "alice");
    h.ledger.hold(&new_wallet, &["m1", "m2"]);
    h.ledger.send_matching_transfer(&new_wallet, 1);

    verify(&h, "bob", &new_wallet).await.unwrap();

    let put_m1 = h.journal.position(&JournalEntry::Put(TokenId::new("m1"))).unwrap();
    let put_m2 = h.journal.position(&JournalEntry::Put(TokenId::new("m2"))).unwrap();
    let grant = h.journal.position(&JournalEntry::Grant(UserId::new("bob"))).unwrap();
    let remove = h.journal.position(&JournalEntry::Remove(UserId::new("alice"))).unwrap();
    assert!(put_m1 < grant && put_m2 < grant);
    assert!(grant < remove);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn concurrent_sessions_on_disjoint_tokens_both_succeed() {
    let h = harness();
    let (wallet_a, wallet_b) = (addr(1), addr(2));
    h.ledger.hold(&wallet_a, &["m1", "m2"]);
    h.ledger.hold(&wallet_b, &["m3", "m4"]);
    h.ledger.send_matching_transfer(&wallet_a, 4);
    h.ledger.send_matching_transfer(&wallet_b, 2);

    let (a, b) = tokio::join!(verify(&h, "alice", &wallet_a), verify(&h, "bob", &wallet_b));
    a.unwrap();
    b.unwrap();

    let snapshot = h.store.get_all().unwrap();
    assert_eq!(snapshot.len(), 4);
    for (mint, user) in [("m1", "alice"), ("m2", "alice"), ("m3", "bob"), ("m4", "bob")] {
        assert_eq!(
            snapshot[&TokenId::new(mint)].requesting_user,
            UserId::new(user)
        );
    }
    assert!(h.gateway.has_role("alice") && h.gateway.has_role("bob"));
    assert!(h.gateway.removals().is_empty());
}
