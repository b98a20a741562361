//! Access revocation.
//!
//! One registry snapshot serves the whole batch. A user keeps the role when
//! any remaining record names them; otherwise the role is removed and a DM
//! is attempted. Every user is processed even if some removals fail.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use mintgate_types::{TokenId, UserId};
use tracing::Instrument;

use crate::{messages, RevocationError, VerifierContext};

/// Users implicated by a verification or a watchdog pass, with the tokens
/// that implicated them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevocationBatch {
    users: BTreeMap<UserId, BTreeSet<TokenId>>,
}

impl RevocationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, user: UserId, token: TokenId) {
        self.users.entry(user).or_default().insert(token);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.users.contains_key(user)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &BTreeSet<TokenId>)> {
        self.users.iter()
    }
}

/// A role removal that did not happen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationFailure {
    pub user: UserId,
    /// Records whose loss implicated the user.
    pub tokens: Vec<TokenId>,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevocationReport {
    /// Role removed.
    pub revoked: Vec<UserId>,
    /// Still named by another record; role kept.
    pub retained: Vec<UserId>,
    /// Role removed but the DM could not be delivered.
    pub unnotified: Vec<UserId>,
}

/// Revoke the role from every user in `batch` who no longer appears as the
/// requesting user of any registry record.
///
/// Fails with [`RevocationError::Snapshot`] before touching anyone if the
/// registry cannot be read, and with [`RevocationError::PartialBatch`] after
/// attempting everyone if some removals failed.
pub async fn revoke_access(
    ctx: &VerifierContext,
    batch: &RevocationBatch,
) -> Result<RevocationReport, RevocationError> {
    if batch.is_empty() {
        return Ok(RevocationReport::default());
    }
    let span = tracing::info_span!("revocation_batch", size = batch.len());
    revoke_batch(ctx, batch).instrument(span).await
}

async fn revoke_batch(
    ctx: &VerifierContext,
    batch: &RevocationBatch,
) -> Result<RevocationReport, RevocationError> {
    let snapshot = ctx.store.get_all()?;
    let still_named: HashSet<&UserId> = snapshot.values().map(|r| &r.requesting_user).collect();

    let mut report = RevocationReport::default();
    let mut failures = Vec::new();
    for (user, tokens) in batch.iter() {
        if still_named.contains(user) {
            tracing::debug!(user = %user, "user still holds a record, keeping role");
            report.retained.push(user.clone());
            continue;
        }

        if let Err(e) = ctx.gateway.remove_role(user).await {
            tracing::error!(user = %user, tokens = ?tokens, "role removal failed: {e}");
            ctx.metrics().revocation_failures.inc();
            failures.push(RevocationFailure {
                user: user.clone(),
                tokens: tokens.iter().cloned().collect(),
                reason: e.to_string(),
            });
            continue;
        }
        ctx.metrics().roles_revoked.inc();
        tracing::info!(user = %user, tokens = ?tokens, "role revoked");
        report.revoked.push(user.clone());

        if let Err(e) = ctx
            .gateway
            .send_direct_message(user, &messages::revoked())
            .await
        {
            tracing::warn!(user = %user, "revocation notice not delivered: {e}");
            report.unnotified.push(user.clone());
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(RevocationError::PartialBatch {
            attempted: batch.len(),
            report,
            failures,
        })
    }
}
