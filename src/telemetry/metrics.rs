//! Prometheus metrics setup and metric definitions

use crate::error::{AppError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Evaluations are dominated by a handful of indexed reads.
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to install Prometheus recorder: {}", e)))
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup (not just after first use).
pub fn describe_metrics() {
    describe_counter!(
        "authgate_rules_evaluations_total",
        "Rule evaluations by outcome (allowed/blocked/degraded)"
    );
    describe_histogram!(
        "authgate_rules_evaluation_duration_seconds",
        "Rule evaluation duration in seconds"
    );
    describe_counter!(
        "authgate_rules_applied_total",
        "Rules whose conditions matched and whose actions were applied"
    );
    describe_counter!(
        "authgate_rules_signal_checks_total",
        "Velocity signal checks by signal and result"
    );
    describe_counter!(
        "authgate_rules_config_warnings_total",
        "Rule configuration problems resolved to a permissive default"
    );

    for outcome in ["allowed", "blocked", "degraded"] {
        counter!("authgate_rules_evaluations_total", "outcome" => outcome).absolute(0);
    }
    counter!("authgate_rules_applied_total").absolute(0);
    histogram!("authgate_rules_evaluation_duration_seconds").record(0.0);
}
