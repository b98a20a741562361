//! Prometheus metrics for sessions, revocations and reconciliation.
//!
//! [`VerificationMetrics`] owns a dedicated [`Registry`] that the HTTP
//! `/metrics` endpoint encodes in the Prometheus text format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

pub struct VerificationMetrics {
    pub registry: Registry,

    // ── Sessions ────────────────────────────────────────────────────────
    pub sessions_started: IntCounter,
    pub sessions_confirmed: IntCounter,
    pub sessions_timed_out: IntCounter,
    /// Invalid address, nothing eligible, or ledger failure before the proof.
    pub sessions_failed: IntCounter,
    /// Proof succeeded but registry write or role grant failed.
    pub bookkeeping_failures: IntCounter,

    // ── Revocation ──────────────────────────────────────────────────────
    pub roles_revoked: IntCounter,
    pub revocation_failures: IntCounter,

    // ── Watchdog ────────────────────────────────────────────────────────
    pub watchdog_passes: IntCounter,
    pub watchdog_skipped_passes: IntCounter,
    pub stale_records: IntCounter,
    pub inconclusive_lookups: IntCounter,

    /// Records in the registry as of the last pass.
    pub registry_size: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("metric names are constant and unique")
}

impl VerificationMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_started = counter(
            &registry,
            "mintgate_sessions_started_total",
            "Verification sessions started",
        );
        let sessions_confirmed = counter(
            &registry,
            "mintgate_sessions_confirmed_total",
            "Sessions whose challenge transfer was observed",
        );
        let sessions_timed_out = counter(
            &registry,
            "mintgate_sessions_timed_out_total",
            "Sessions that reached the deadline without a transfer",
        );
        let sessions_failed = counter(
            &registry,
            "mintgate_sessions_failed_total",
            "Sessions that ended before a challenge was confirmed",
        );
        let bookkeeping_failures = counter(
            &registry,
            "mintgate_bookkeeping_failures_total",
            "Confirmed sessions whose registry write or role grant failed",
        );
        let roles_revoked = counter(
            &registry,
            "mintgate_roles_revoked_total",
            "Roles removed from users without remaining records",
        );
        let revocation_failures = counter(
            &registry,
            "mintgate_revocation_failures_total",
            "Role removals that failed",
        );
        let watchdog_passes = counter(
            &registry,
            "mintgate_watchdog_passes_total",
            "Completed reconciliation passes",
        );
        let watchdog_skipped_passes = counter(
            &registry,
            "mintgate_watchdog_skipped_passes_total",
            "Reconciliation passes skipped because the registry was unreadable",
        );
        let stale_records = counter(
            &registry,
            "mintgate_stale_records_total",
            "Registry records deleted because the token changed hands",
        );
        let inconclusive_lookups = counter(
            &registry,
            "mintgate_inconclusive_lookups_total",
            "Owner lookups that failed and were skipped",
        );
        let registry_size = register_int_gauge_with_registry!(
            Opts::new("mintgate_registry_size", "Tracked tokens at the last pass"),
            registry
        )
        .expect("metric names are constant and unique");

        Self {
            registry,
            sessions_started,
            sessions_confirmed,
            sessions_timed_out,
            sessions_failed,
            bookkeeping_failures,
            roles_revoked,
            revocation_failures,
            watchdog_passes,
            watchdog_skipped_passes,
            stale_records,
            inconclusive_lookups,
            registry_size,
        }
    }
}

impl Default for VerificationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
