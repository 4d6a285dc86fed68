//! Prometheus metrics for the anchor worker.
//!
//! The [`WorkerMetrics`] struct owns a dedicated [`Registry`] that the
//! deployment's scrape endpoint can encode into the Prometheus text
//! exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of worker-level Prometheus metrics.
pub struct WorkerMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total queue messages that entered the handler.
    pub messages_handled: IntCounter,
    /// Total messages acknowledged (handled to completion).
    pub messages_acked: IntCounter,
    /// Total messages negative-acknowledged (left for redelivery).
    pub messages_nacked: IntCounter,
    /// Total records newly submitted to the ledger.
    pub records_submitted: IntCounter,
    /// Total abandoned claims recovered from an existing ledger entry.
    pub records_recovered: IntCounter,
    /// Total records whose submission the ledger rejected (terminal).
    pub records_failed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current consecutive-failure streak driving the backoff gate.
    pub failure_streak: IntGauge,
}

impl WorkerMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let messages_handled = register_int_counter_with_registry!(
            Opts::new(
                "anchor_messages_handled_total",
                "Total queue messages that entered the handler"
            ),
            registry
        )
        .expect("failed to register messages_handled counter");

        let messages_acked = register_int_counter_with_registry!(
            Opts::new("anchor_messages_acked_total", "Total messages acknowledged"),
            registry
        )
        .expect("failed to register messages_acked counter");

        let messages_nacked = register_int_counter_with_registry!(
            Opts::new(
                "anchor_messages_nacked_total",
                "Total messages negative-acknowledged"
            ),
            registry
        )
        .expect("failed to register messages_nacked counter");

        let records_submitted = register_int_counter_with_registry!(
            Opts::new(
                "anchor_records_submitted_total",
                "Total records newly submitted to the ledger"
            ),
            registry
        )
        .expect("failed to register records_submitted counter");

        let records_recovered = register_int_counter_with_registry!(
            Opts::new(
                "anchor_records_recovered_total",
                "Total abandoned claims recovered from an existing ledger entry"
            ),
            registry
        )
        .expect("failed to register records_recovered counter");

        let records_failed = register_int_counter_with_registry!(
            Opts::new(
                "anchor_records_failed_total",
                "Total records whose submission the ledger rejected"
            ),
            registry
        )
        .expect("failed to register records_failed counter");

        let failure_streak = register_int_gauge_with_registry!(
            Opts::new(
                "anchor_failure_streak",
                "Current consecutive-failure streak driving the backoff gate"
            ),
            registry
        )
        .expect("failed to register failure_streak gauge");

        Self {
            registry,
            messages_handled,
            messages_acked,
            messages_nacked,
            records_submitted,
            records_recovered,
            records_failed,
            failure_streak,
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
