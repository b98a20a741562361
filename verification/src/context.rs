//! Everything a session, revocation or watchdog pass needs, passed
//! explicitly at construction.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mintgate_gateway::RoleGateway;
use mintgate_oracle::{EligibleSet, LedgerOracle};
use mintgate_store::OwnershipStore;
use mintgate_types::Lamports;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::{draw_amount, VerificationMetrics};

/// Tunables for the verification protocol.
#[derive(Clone, Debug)]
pub struct VerifierSettings {
    /// Allow-listed mints that qualify a wallet.
    pub eligible: EligibleSet,
    /// How long a user has to send the challenge transfer.
    pub challenge_deadline: Duration,
    /// Delay between transfer checks.
    pub poll_interval: Duration,
    /// Delay between reconciliation passes.
    pub watchdog_period: Duration,
    /// Concurrent owner lookups within one pass.
    pub watchdog_fan_out: usize,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            eligible: EligibleSet::new(),
            challenge_deadline: Duration::from_secs(600),
            poll_interval: Duration::from_secs(3),
            watchdog_period: Duration::from_secs(6 * 60 * 60),
            watchdog_fan_out: 8,
        }
    }
}

pub struct VerifierContext {
    pub store: Arc<dyn OwnershipStore>,
    pub oracle: Arc<dyn LedgerOracle>,
    pub gateway: Arc<dyn RoleGateway>,
    pub settings: VerifierSettings,
    metrics: Arc<VerificationMetrics>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl VerifierContext {
    pub fn new(
        store: Arc<dyn OwnershipStore>,
        oracle: Arc<dyn LedgerOracle>,
        gateway: Arc<dyn RoleGateway>,
        settings: VerifierSettings,
    ) -> Self {
        Self {
            store,
            oracle,
            gateway,
            settings,
            metrics: Arc::new(VerificationMetrics::new()),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
        }
    }

    /// Replace the challenge random source.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<VerificationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &VerificationMetrics {
        &self.metrics
    }

    pub fn metrics_handle(&self) -> Arc<VerificationMetrics> {
        Arc::clone(&self.metrics)
    }

    pub(crate) fn draw_challenge_amount(&self) -> Lamports {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        draw_amount(&mut **rng)
    }
}
