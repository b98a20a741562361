//! Verification session: one `/verify` invocation from address to role.
//!
//! Each step method checks the current [`SessionState`], performs its I/O
//! and advances the state. [`VerificationSession::run`] chains the steps and
//! reports progress through a [`Responder`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use mintgate_gateway::Responder;
use mintgate_types::{Timestamp, TokenId, UserId, WalletAddress};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::{
    messages, revoke_access, Challenge, RevocationBatch, RevocationError, SessionError,
    SessionState, VerifierContext,
};

/// Smallest accepted poll period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a completed session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub address: WalletAddress,
    /// Tokens now recorded for the user.
    pub tokens: BTreeSet<TokenId>,
    /// Previous requesting users whose claims were replaced.
    pub superseded: Vec<UserId>,
    /// Superseded users that lost the role.
    pub revoked: Vec<UserId>,
}

pub struct VerificationSession {
    ctx: Arc<VerifierContext>,
    user: UserId,
    state: SessionState,
    address: Option<WalletAddress>,
    candidates: BTreeSet<TokenId>,
    challenge: Option<Challenge>,
}

impl VerificationSession {
    pub fn new(ctx: Arc<VerifierContext>, user: UserId) -> Self {
        Self {
            ctx,
            user,
            state: SessionState::AwaitingAddress,
            address: None,
            candidates: BTreeSet::new(),
            challenge: None,
        }
    }

    /// Run a whole session for `user`, replying through `responder`.
    ///
    /// Failures before the challenge replace the deferred reply; everything
    /// after it is sent as a follow-up.
    pub async fn run(
        ctx: Arc<VerifierContext>,
        user: UserId,
        raw_address: &str,
        responder: &dyn Responder,
    ) -> Result<Confirmation, SessionError> {
        let span = tracing::info_span!("verify_session", user = %user, address = %raw_address.trim());
        let mut session = Self::new(ctx, user);
        session.drive(raw_address, responder).instrument(span).await
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.address.as_ref()
    }

    /// Eligible tokens found for the claimed address.
    pub fn candidates(&self) -> &BTreeSet<TokenId> {
        &self.candidates
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// `AwaitingAddress -> AddressValidated`.
    pub fn validate_address(&mut self, raw: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::AwaitingAddress)?;
        match WalletAddress::parse(raw) {
            Ok(address) => {
                self.address = Some(address);
                self.state = SessionState::AddressValidated;
                Ok(())
            }
            Err(source) => Err(self.fail(SessionError::InvalidAddress {
                input: raw.trim().to_string(),
                source,
            })),
        }
    }

    /// `AddressValidated -> ChallengeIssued`: look up eligible holdings and
    /// draw the challenge amount.
    pub async fn issue_challenge(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::AddressValidated)?;
        let address = self.claimed_address()?;

        let lookup = self
            .ctx
            .oracle
            .owned_eligible_tokens(&address, &self.ctx.settings.eligible)
            .await;
        let owned = match lookup {
            Ok(owned) => owned,
            Err(e) => return Err(self.fail(e.into())),
        };
        if owned.is_empty() {
            return Err(self.fail(SessionError::NoEligibleTokens(address)));
        }

        let window = self.ctx.settings.challenge_deadline;
        let issued_at = Timestamp::now();
        let challenge = Challenge {
            address,
            amount: self.ctx.draw_challenge_amount(),
            issued_at,
            expires_at: issued_at.saturating_add(window),
            deadline: Instant::now() + window,
        };
        tracing::info!(
            tokens = owned.len(),
            amount = challenge.amount.raw(),
            "challenge issued"
        );
        self.candidates = owned;
        self.challenge = Some(challenge);
        self.state = SessionState::ChallengeIssued;
        Ok(())
    }

    /// `ChallengeIssued -> Confirmed | TimedOut`.
    ///
    /// Polls the ledger every poll interval until a matching transfer shows
    /// up or the deadline passes. A failed check counts as "not yet". The
    /// poll loop is dropped at the deadline, so nothing runs after it.
    pub async fn await_transfer(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::ChallengeIssued)?;
        let Some(challenge) = self.challenge.clone() else {
            return Err(self.invalid_state(SessionState::ChallengeIssued));
        };

        let oracle = Arc::clone(&self.ctx.oracle);
        let not_before = challenge.not_before();
        let period = self.ctx.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let poll = async {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let seen = oracle
                    .has_transfer_occurred(&challenge.address, challenge.amount, not_before)
                    .await;
                match seen {
                    Ok(true) => return,
                    Ok(false) => tracing::trace!("challenge transfer not seen yet"),
                    Err(e) => tracing::warn!("transfer check failed, retrying next tick: {e}"),
                }
            }
        };

        match tokio::time::timeout_at(challenge.deadline, poll).await {
            Ok(()) => {
                tracing::info!("challenge transfer confirmed");
                self.state = SessionState::Confirmed;
                Ok(())
            }
            Err(_) => {
                self.state = SessionState::TimedOut;
                Err(SessionError::TimedOut {
                    address: challenge.address.clone(),
                    amount: challenge.amount,
                })
            }
        }
    }

    /// After confirmation: record every candidate token for this user, grant
    /// the role, then revoke superseded users.
    ///
    /// A failure here moves the session to `Failed` but the error reports
    /// that the proof itself succeeded.
    pub async fn finalize(&mut self) -> Result<Confirmation, SessionError> {
        self.expect_state(SessionState::Confirmed)?;
        let address = self.claimed_address()?;

        let recorded = self.record_and_grant(&address).await;
        let superseded = match recorded {
            Ok(batch) => batch,
            Err(e) => return Err(self.fail(e)),
        };

        let revoked = match revoke_access(&self.ctx, &superseded).await {
            Ok(report) => report.revoked,
            Err(RevocationError::PartialBatch { report, failures, .. }) => {
                tracing::error!(
                    failed = failures.len(),
                    "some superseded users kept the role: {:?}",
                    failures
                );
                report.revoked
            }
            Err(e) => {
                tracing::error!("superseded users not revoked: {e}");
                Vec::new()
            }
        };

        Ok(Confirmation {
            address,
            tokens: self.candidates.clone(),
            superseded: superseded.iter().map(|(user, _)| user.clone()).collect(),
            revoked,
        })
    }

    async fn record_and_grant(
        &self,
        address: &WalletAddress,
    ) -> Result<RevocationBatch, SessionError> {
        let mut superseded = RevocationBatch::new();
        for token in &self.candidates {
            if let Some(previous) = self.ctx.store.get(token)? {
                if previous.requesting_user != self.user && previous.owner_address != *address {
                    tracing::info!(
                        mint = %token,
                        previous_user = %previous.requesting_user,
                        "claim superseded"
                    );
                    superseded.add(previous.requesting_user, token.clone());
                }
            }
            self.ctx.store.set(token, address, &self.user)?;
        }
        self.ctx
            .gateway
            .grant_role(&self.user)
            .await
            .map_err(SessionError::RoleGrant)?;
        Ok(superseded)
    }

    async fn drive(
        &mut self,
        raw_address: &str,
        responder: &dyn Responder,
    ) -> Result<Confirmation, SessionError> {
        let metrics = self.ctx.metrics_handle();
        metrics.sessions_started.inc();

        let result = self.steps(raw_address, responder).await;
        let text = match &result {
            Ok(confirmation) => {
                metrics.sessions_confirmed.inc();
                tracing::info!(tokens = confirmation.tokens.len(), "ownership verified");
                messages::verified(&confirmation.address, confirmation.tokens.len())
            }
            Err(e) => {
                if e.after_proof() {
                    metrics.sessions_confirmed.inc();
                    metrics.bookkeeping_failures.inc();
                    tracing::error!(
                        tokens = ?self.candidates,
                        "proof accepted but bookkeeping failed, needs manual follow-up: {e}"
                    );
                } else if matches!(e, SessionError::TimedOut { .. }) {
                    metrics.sessions_timed_out.inc();
                    tracing::info!("{e}");
                } else {
                    metrics.sessions_failed.inc();
                    if e.is_fault() {
                        tracing::warn!("session aborted: {e}");
                    } else {
                        tracing::info!("session ended: {e}");
                    }
                }
                messages::for_error(e)
            }
        };
        self.reply(responder, &text).await;
        result
    }

    async fn steps(
        &mut self,
        raw_address: &str,
        responder: &dyn Responder,
    ) -> Result<Confirmation, SessionError> {
        self.validate_address(raw_address)?;
        self.issue_challenge().await?;
        if let Some(challenge) = &self.challenge {
            let prompt = messages::challenge_prompt(
                challenge,
                self.candidates.len(),
                self.ctx.settings.challenge_deadline,
            );
            if let Err(e) = responder.edit_original(&prompt).await {
                tracing::warn!("challenge prompt not delivered: {e}");
            }
        }
        self.await_transfer().await?;
        self.finalize().await
    }

    /// Before a challenge the deferred reply is replaced, afterwards the
    /// prompt stays visible and results are follow-ups.
    async fn reply(&self, responder: &dyn Responder, text: &str) {
        let sent = if self.challenge.is_some() {
            responder.follow_up(text).await
        } else {
            responder.edit_original(text).await
        };
        if let Err(e) = sent {
            tracing::warn!("session reply not delivered: {e}");
        }
    }

    fn claimed_address(&self) -> Result<WalletAddress, SessionError> {
        match &self.address {
            Some(address) => Ok(address.clone()),
            None => Err(self.invalid_state(SessionState::AddressValidated)),
        }
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: SessionState) -> SessionError {
        SessionError::InvalidState {
            expected,
            actual: self.state,
        }
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.state = SessionState::Failed;
        err
    }
}
