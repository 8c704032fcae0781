//! # Metrics
//!
//! Prometheus metrics for monitoring the multi-region store.
//!
//! ## Metrics Exposed
//!
//! - `regional_secrets_region_calls_total` - Regional backend calls by region, call, and outcome
//! - `regional_secrets_region_call_duration_seconds` - Duration of regional backend calls
//! - `regional_secrets_retries_total` - Retries of the failed region subset by operation
//! - `regional_secrets_rollbacks_total` - Compensations issued after failed writes, by outcome
//! - `regional_secrets_inconsistencies_total` - Reads that found regions disagreeing
//! - `regional_secrets_partial_failures_total` - Operations that left regions inconsistent

use anyhow::Result;
use prometheus::{
    core::Collector, Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REGION_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "regional_secrets_region_calls_total",
            "Total number of regional backend calls by region, call, and outcome",
        ),
        &["region", "call", "outcome"],
    )
    .expect("Failed to create REGION_CALLS_TOTAL metric - this should never happen")
});

static REGION_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "regional_secrets_region_call_duration_seconds",
            "Duration of regional backend calls in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["region", "call"],
    )
    .expect("Failed to create REGION_CALL_DURATION metric - this should never happen")
});

static RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "regional_secrets_retries_total",
            "Total number of failed-subset retries by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create RETRIES_TOTAL metric - this should never happen")
});

static ROLLBACKS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "regional_secrets_rollbacks_total",
            "Total number of regional compensations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create ROLLBACKS_TOTAL metric - this should never happen")
});

static INCONSISTENCIES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "regional_secrets_inconsistencies_total",
        "Total number of reads that found regions disagreeing",
    )
    .expect("Failed to create INCONSISTENCIES_TOTAL metric - this should never happen")
});

static PARTIAL_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "regional_secrets_partial_failures_total",
            "Total number of operations that left regions inconsistent",
        ),
        &["operation"],
    )
    .expect("Failed to create PARTIAL_FAILURES_TOTAL metric - this should never happen")
});

fn register<C: Collector + Clone + 'static>(collector: &C) -> Result<()> {
    match REGISTRY.register(Box::new(collector.clone())) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Register all metrics with the crate registry; safe to call more than once
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    register(&*REGION_CALLS_TOTAL)?;
    register(&*REGION_CALL_DURATION)?;
    register(&*RETRIES_TOTAL)?;
    register(&*ROLLBACKS_TOTAL)?;
    register(&*INCONSISTENCIES_TOTAL)?;
    register(&*PARTIAL_FAILURES_TOTAL)?;
    Ok(())
}

/// Record the outcome of one regional backend call
///
/// `outcome` is one of `success`, `not_found`, `timeout`, or `error`.
pub fn record_region_call(region: &str, call: &str, outcome: &str, duration: f64) {
    REGION_CALLS_TOTAL
        .with_label_values(&[region, call, outcome])
        .inc();
    REGION_CALL_DURATION
        .with_label_values(&[region, call])
        .observe(duration);
}

pub fn increment_retries(operation: &str) {
    RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_rollback(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    ROLLBACKS_TOTAL.with_label_values(&[operation, outcome]).inc();
}

pub fn increment_inconsistencies() {
    INCONSISTENCIES_TOTAL.inc();
}

pub fn increment_partial_failures(operation: &str) {
    PARTIAL_FAILURES_TOTAL.with_label_values(&[operation]).inc();
}

/// Render every registered metric in the Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_record_region_call() {
        let before = REGION_CALLS_TOTAL
            .with_label_values(&["test-region", "put", "error"])
            .get();
        record_region_call("test-region", "put", "error", 0.2);
        let after = REGION_CALLS_TOTAL
            .with_label_values(&["test-region", "put", "error"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_rollback() {
        let before = ROLLBACKS_TOTAL.with_label_values(&["create", "success"]).get();
        record_rollback("create", true);
        let after = ROLLBACKS_TOTAL.with_label_values(&["create", "success"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_render_includes_registered_metrics() {
        register_metrics().unwrap();
        increment_inconsistencies();
        let text = render().unwrap();
        assert!(text.contains("regional_secrets_inconsistencies_total"));
    }
}
