//! Metrics recorder installation and family descriptions
//!
//! Metric writes happen inline at the emission sites via the `metrics`
//! macros; this module owns the exporter setup so the histogram buckets and
//! family descriptions live in one place.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use modgate_core::{Error, Result};
use tracing::info;

/// Latency histogram buckets in seconds, aligned to the 100ms SLA
pub const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.5, 1.0];

/// Per-rule execution histogram buckets in seconds
pub const RULE_EXECUTION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1];

/// Install the Prometheus recorder and return the render handle
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("modgate_moderation_latency_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| Error::config(format!("failed to set latency buckets: {e}")))?
        .set_buckets_for_metric(
            Matcher::Full("modgate_rule_execution_seconds".to_string()),
            RULE_EXECUTION_BUCKETS,
        )
        .map_err(|e| Error::config(format!("failed to set rule buckets: {e}")))?
        .install_recorder()
        .map_err(|e| Error::config(format!("failed to install metrics recorder: {e}")))?;

    describe_metrics();
    info!("metrics exporter initialized");
    Ok(handle)
}

/// Describe every metric family the pipeline emits
pub fn describe_metrics() {
    metrics::describe_histogram!(
        "modgate_moderation_latency_seconds",
        "Time spent in the moderation engine per request"
    );
    metrics::describe_counter!(
        "modgate_sla_violations_total",
        "Moderation requests exceeding the latency ceiling"
    );
    metrics::describe_counter!(
        "modgate_requests_total",
        "Moderation requests processed, by region and status"
    );
    metrics::describe_counter!(
        "modgate_responses_total",
        "Responses by moderation decision and region"
    );
    metrics::describe_counter!(
        "modgate_interception_total",
        "Replies intercepted by the engine; intercepted=\"false\" only on the failsafe path"
    );
    metrics::describe_counter!(
        "modgate_rules_triggered_total",
        "Rule triggers by kind"
    );
    metrics::describe_histogram!(
        "modgate_rule_execution_seconds",
        "Per-rule evaluation time by kind"
    );
    metrics::describe_counter!(
        "modgate_detector_errors_total",
        "Detector failures by detector and reason"
    );
    metrics::describe_counter!(
        "modgate_audit_attempts_total",
        "Audit emissions attempted; equals moderation invocations"
    );
    metrics::describe_counter!(
        "modgate_audit_dropped_total",
        "Audit records dropped because the queue was full"
    );
    metrics::describe_counter!(
        "modgate_audit_failures_total",
        "Audit records that failed to persist"
    );
    metrics::describe_counter!(
        "modgate_rule_store_errors_total",
        "Rule store read failures"
    );
    metrics::describe_gauge!(
        "modgate_active_rules",
        "Active rules in the current snapshot"
    );
}
