//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `keycloak_client_reconciliations_total` - Total number of reconciliations
//! - `keycloak_client_reconciliation_errors_total` - Total number of failed reconciliations
//! - `keycloak_client_reconciliation_duration_seconds` - Duration of reconciliations
//! - `keycloak_client_requeues_total{reason}` - Requeues by reason
//! - `keycloak_client_sync_operations_total{kind,operation}` - Create/update/delete calls made by the chain
//! - `keycloak_client_step_failures_total{step}` - Chain steps that failed
//! - `keycloak_client_api_requests_total{method,status}` - Keycloak admin API requests
//! - `keycloak_client_api_request_duration_seconds` - Duration of Keycloak admin API requests

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keycloak_client_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "keycloak_client_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "keycloak_client_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_client_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static SYNC_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_client_sync_operations_total",
            "Total number of create, update and delete calls made while syncing",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create SYNC_OPERATIONS_TOTAL metric - this should never happen")
});

static STEP_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_client_step_failures_total",
            "Total number of failed reconciliation chain steps",
        ),
        &["step"],
    )
    .expect("Failed to create STEP_FAILURES_TOTAL metric - this should never happen")
});

static API_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_client_api_requests_total",
            "Total number of Keycloak admin API requests",
        ),
        &["method", "status"],
    )
    .expect("Failed to create API_REQUESTS_TOTAL metric - this should never happen")
});

static API_REQUEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "keycloak_client_api_request_duration_seconds",
            "Duration of Keycloak admin API requests in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create API_REQUEST_DURATION metric - this should never happen")
});

/// Register all metrics with the global registry
///
/// # Errors
/// Fails when called twice, since a collector can only be registered once.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STEP_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_REQUEST_DURATION.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_sync_operations(kind: &str, operation: &str) {
    SYNC_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_step_failures(step: &str) {
    STEP_FAILURES_TOTAL.with_label_values(&[step]).inc();
}

/// Record one admin API request; `status` is the HTTP status code, or `error`
/// when no response arrived
pub fn record_api_request(method: &str, status: &str, duration: f64) {
    API_REQUESTS_TOTAL.with_label_values(&[method, status]).inc();
    API_REQUEST_DURATION.observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        let after = RECONCILIATIONS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL.get();
        increment_reconciliation_errors();
        let after = RECONCILIATION_ERRORS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION.get_sample_count();
        observe_reconciliation_duration(1.5);
        assert!(RECONCILIATION_DURATION.get_sample_count() > before);
    }

    #[test]
    fn test_increment_requeues_total() {
        let before = REQUEUES_TOTAL.with_label_values(&["test-requeue"]).get();
        increment_requeues_total("test-requeue");
        let after = REQUEUES_TOTAL.with_label_values(&["test-requeue"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_sync_operations_by_label() {
        let before = SYNC_OPERATIONS_TOTAL
            .with_label_values(&["test kind", "delete"])
            .get();
        increment_sync_operations("test kind", "delete");
        let after = SYNC_OPERATIONS_TOTAL
            .with_label_values(&["test kind", "delete"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_step_failures() {
        let before = STEP_FAILURES_TOTAL.with_label_values(&["test step"]).get();
        increment_step_failures("test step");
        let after = STEP_FAILURES_TOTAL.with_label_values(&["test step"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_api_request() {
        let before = API_REQUESTS_TOTAL.with_label_values(&["TEST", "200"]).get();
        let before_samples = API_REQUEST_DURATION.get_sample_count();
        record_api_request("TEST", "200", 0.02);
        let after = API_REQUESTS_TOTAL.with_label_values(&["TEST", "200"]).get();
        assert_eq!(after, before + 1u64);
        assert!(API_REQUEST_DURATION.get_sample_count() > before_samples);
    }
}
