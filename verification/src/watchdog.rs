//! Reconciliation watchdog.
//!
//! Every period: snapshot the registry, look up each token's current owner
//! with bounded concurrency, delete records whose owner moved (unless a
//! session rewrote them meanwhile), and revoke the affected users once.
//! Failed lookups skip that token for the pass. An unreadable registry
//! skips the whole pass.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use mintgate_store::OwnershipRecord;
use mintgate_types::{TokenId, UserId, WalletAddress};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::{
    revoke_access, RevocationBatch, RevocationError, RevocationFailure, VerifierContext,
    WatchdogError,
};

/// A record found to disagree with the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaleRecord {
    pub token: TokenId,
    pub record: OwnershipRecord,
    pub current_owner: WalletAddress,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Records in the snapshot.
    pub checked: usize,
    /// Deleted because the token changed hands.
    pub stale: Vec<StaleRecord>,
    /// Owner lookup failed; left untouched.
    pub inconclusive: Vec<TokenId>,
    /// Stale but the delete failed; retried next pass.
    pub delete_failures: Vec<TokenId>,
    /// Stale in the snapshot but rewritten by a session since; kept.
    pub reverified: Vec<TokenId>,
    pub revoked: Vec<UserId>,
    pub retained: Vec<UserId>,
    pub revocation_failures: Vec<RevocationFailure>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.stale.is_empty() && self.revoked.is_empty() && self.delete_failures.is_empty()
    }
}

/// One reconciliation pass.
pub async fn run_pass(ctx: &VerifierContext) -> Result<PassReport, WatchdogError> {
    let result = reconcile(ctx).instrument(tracing::info_span!("watchdog_pass")).await;
    match &result {
        Ok(report) => {
            ctx.metrics().watchdog_passes.inc();
            tracing::info!(
                checked = report.checked,
                stale = report.stale.len(),
                inconclusive = report.inconclusive.len(),
                reverified = report.reverified.len(),
                revoked = report.revoked.len(),
                "reconciliation pass finished"
            );
        }
        Err(e) => {
            ctx.metrics().watchdog_skipped_passes.inc();
            tracing::error!("{e}");
        }
    }
    result
}

async fn reconcile(ctx: &VerifierContext) -> Result<PassReport, WatchdogError> {
    let snapshot = ctx.store.get_all()?;
    ctx.metrics().registry_size.set(snapshot.len() as i64);

    let mut report = PassReport {
        checked: snapshot.len(),
        ..PassReport::default()
    };

    let fan_out = ctx.settings.watchdog_fan_out.max(1);
    let oracle = &ctx.oracle;
    let lookups: Vec<_> = stream::iter(snapshot)
        .map(|(token, record)| async move {
            let owner = oracle.current_owner(&token).await;
            (token, record, owner)
        })
        .buffer_unordered(fan_out)
        .collect()
        .await;

    let mut batch = RevocationBatch::new();
    for (token, record, owner) in lookups {
        let current_owner = match owner {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(mint = %token, "owner lookup failed, skipping token this pass: {e}");
                ctx.metrics().inconclusive_lookups.inc();
                report.inconclusive.push(token);
                continue;
            }
        };
        if current_owner == record.owner_address {
            continue;
        }

        // The snapshot may be minutes old by now; only remove the record if
        // no session rewrote it in the meantime.
        match ctx.store.delete_if(&token, &record) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(mint = %token, "record re-verified since snapshot, keeping it");
                report.reverified.push(token);
                continue;
            }
            Err(e) => {
                tracing::error!(mint = %token, user = %record.requesting_user, "stale record not deleted: {e}");
                report.delete_failures.push(token);
                continue;
            }
        }
        tracing::info!(
            mint = %token,
            user = %record.requesting_user,
            recorded = %record.owner_address,
            current = %current_owner,
            "stale record removed"
        );
        ctx.metrics().stale_records.inc();
        batch.add(record.requesting_user.clone(), token.clone());
        report.stale.push(StaleRecord {
            token,
            record,
            current_owner,
        });
    }
    report.stale.sort_by(|a, b| a.token.cmp(&b.token));
    report.inconclusive.sort();
    report.reverified.sort();

    match revoke_access(ctx, &batch).await {
        Ok(revocation) => {
            report.revoked = revocation.revoked;
            report.retained = revocation.retained;
        }
        Err(RevocationError::PartialBatch {
            report: revocation,
            failures,
            ..
        }) => {
            report.revoked = revocation.revoked;
            report.retained = revocation.retained;
            report.revocation_failures = failures;
        }
        Err(RevocationError::Snapshot(e)) => {
            tracing::error!(users = batch.len(), "revocation skipped, registry unreadable: {e}");
            report.revocation_failures = batch
                .iter()
                .map(|(user, tokens)| RevocationFailure {
                    user: user.clone(),
                    tokens: tokens.iter().cloned().collect(),
                    reason: e.to_string(),
                })
                .collect();
        }
    }
    Ok(report)
}

/// Run passes every `watchdog_period` until shutdown. The first pass starts
/// one full period after launch.
pub async fn run_watchdog(ctx: Arc<VerifierContext>, mut shutdown: broadcast::Receiver<()>) {
    let period = ctx.settings.watchdog_period.max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(period_secs = period.as_secs(), "reconciliation watchdog started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    // Skipped passes are logged and counted inside.
                    _ = run_pass(&ctx) => {}
                }
            }
        }
    }
    tracing::info!("reconciliation watchdog stopped");
}
