//! Prometheus metrics for Sieve.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `sieve_validation_failures_total` | Counter | `stage` | Requests rejected by validation |
//! | `sieve_lookups_total` | Counter | `field`, `outcome` | Settled lookups |
//! | `sieve_resolution_duration_seconds` | Histogram | - | Fan-out to fan-in latency |
//! | `sieve_errors_formatted_total` | Counter | `name`, `status` | Errors rendered by the formatter |
//!
//! Recording works without [`init_metrics`]; the `metrics` facade discards
//! observations until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Installs the Prometheus recorder.
///
/// The recorder has no listener of its own; expose [`render_metrics`] from
/// whatever endpoint the host service already serves.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "sieve_validation_failures_total",
        "Requests rejected by schema validation"
    );
    describe_counter!(
        "sieve_lookups_total",
        "External reference lookups by field and outcome"
    );
    describe_histogram!(
        "sieve_resolution_duration_seconds",
        "Time from lookup fan-out until every lookup settled"
    );
    describe_counter!(
        "sieve_errors_formatted_total",
        "Uncaught errors rendered as JSON responses"
    );
}

/// Records a request rejected by validation.
///
/// `stage` is `validation` for route schemas and `resolution` for the
/// dynamic schema built after lookups.
pub fn record_validation_failure(stage: &'static str) {
    counter!("sieve_validation_failures_total", "stage" => stage).increment(1);
}

/// Records a settled lookup.
///
/// `outcome` is `resolved` on success or a failure label such as `not_found`.
pub fn record_lookup(field: &str, outcome: &'static str) {
    counter!(
        "sieve_lookups_total",
        "field" => field.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Records the wall time of one resolution fan-out.
pub fn record_resolution_duration(duration: Duration) {
    histogram!("sieve_resolution_duration_seconds").record(duration.as_secs_f64());
}

/// Records an error rendered by the formatter.
pub fn record_formatted_error(name: &'static str, status: u16) {
    counter!(
        "sieve_errors_formatted_total",
        "name" => name,
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_without_recorder() {
        record_validation_failure("validation");
        record_lookup("author", "resolved");
        record_resolution_duration(Duration::from_millis(3));
        record_formatted_error("InternalServerError", 500);
    }

    #[test]
    fn test_disabled_metrics_skip_recorder() {
        assert!(init_metrics(&MetricsConfig { enabled: false }).is_ok());
    }
}
