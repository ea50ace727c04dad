//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Session cache (logins)
//! - Webhook resolution (which source produced the ticket id)
//! - Relay runs and the stage each failure happened in
//! - Diagnosis model calls

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Session
// =============================================================================

/// Backend logins by result.
pub static SESSION_LOGINS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketlens_session_logins_total", "Total backend logins"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Webhook
// =============================================================================

/// Webhook ticket resolutions by source.
pub static WEBHOOK_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketlens_webhook_resolutions_total",
            "Total webhook ticket id resolutions",
        ),
        &["source"], // "payload", "event_log", "unresolved"
    )
    .unwrap()
});

// =============================================================================
// Relay
// =============================================================================

/// Relay runs by outcome.
pub static RELAY_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketlens_relay_runs_total", "Total relay runs"),
        &["outcome"], // "success", "failure"
    )
    .unwrap()
});

/// Relay failures by stage.
pub static RELAY_STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketlens_relay_stage_failures_total",
            "Relay failures by the stage that failed",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Relay run duration in seconds.
pub static RELAY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketlens_relay_duration_seconds",
            "Duration of a relay run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Diagnosis
// =============================================================================

/// Diagnosis model calls by provider and result.
pub static ORACLE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketlens_oracle_calls_total", "Total diagnosis model calls"),
        &["provider", "result"], // result: "success", "error", "malformed"
    )
    .unwrap()
});

/// Diagnosis model call latency.
pub static ORACLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketlens_oracle_duration_seconds",
            "Duration of diagnosis model calls",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SESSION_LOGINS.clone()),
        Box::new(WEBHOOK_RESOLUTIONS.clone()),
        Box::new(RELAY_RUNS.clone()),
        Box::new(RELAY_STAGE_FAILURES.clone()),
        Box::new(RELAY_DURATION.clone()),
        Box::new(ORACLE_CALLS.clone()),
        Box::new(ORACLE_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        RELAY_RUNS.with_label_values(&["success"]).inc();
        assert!(registry
            .gather()
            .iter()
            .any(|f| f.get_name() == "ticketlens_relay_runs_total"));
    }
}
