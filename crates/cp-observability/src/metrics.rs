//! Metrics for Campus Pulse.
//!
//! This module installs the Prometheus recorder and declares the metric
//! names the API emits, so handlers and dashboards agree on spelling.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Total HTTP requests, labeled by method and status.
pub const HTTP_REQUESTS_TOTAL: &str = "campus_pulse_http_requests_total";

/// HTTP request latency histogram, labeled by method.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "campus_pulse_http_request_duration_seconds";

/// Login attempts, labeled by status (success/failure).
pub const LOGIN_ATTEMPTS_TOTAL: &str = "campus_pulse_login_attempts_total";

/// Login attempts rejected by the rate limiter.
pub const LOGIN_RATE_LIMITED_TOTAL: &str = "campus_pulse_login_rate_limited_total";

/// Feedback submissions accepted, labeled by campaign kind.
pub const FEEDBACK_SUBMISSIONS_TOTAL: &str = "campus_pulse_feedback_submissions_total";

/// Individual feedback entries written, labeled by campaign kind.
pub const FEEDBACK_ENTRIES_TOTAL: &str = "campus_pulse_feedback_entries_total";

/// Coordinator CSV reports generated, labeled by report name.
pub const REPORTS_GENERATED_TOTAL: &str = "campus_pulse_reports_generated_total";

/// Roster CSV imports processed.
pub const ROSTER_IMPORTS_TOTAL: &str = "campus_pulse_roster_imports_total";

/// Installs the Prometheus recorder and returns the render handle.
///
/// The handle is stored on the API state so `GET /metrics` can render the
/// current snapshot. Fails if a recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Registers metric descriptions.
pub fn register_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(LOGIN_ATTEMPTS_TOTAL, "Total number of login attempts");
    describe_counter!(
        LOGIN_RATE_LIMITED_TOTAL,
        "Login attempts rejected by rate limiting"
    );
    describe_counter!(
        FEEDBACK_SUBMISSIONS_TOTAL,
        "Total number of accepted feedback submissions"
    );
    describe_counter!(
        FEEDBACK_ENTRIES_TOTAL,
        "Total number of feedback entries written"
    );
    describe_counter!(
        REPORTS_GENERATED_TOTAL,
        "Total number of coordinator reports generated"
    );
    describe_counter!(ROSTER_IMPORTS_TOTAL, "Total number of roster CSV imports");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_share_prefix() {
        let names = [
            HTTP_REQUESTS_TOTAL,
            HTTP_REQUEST_DURATION_SECONDS,
            LOGIN_ATTEMPTS_TOTAL,
            LOGIN_RATE_LIMITED_TOTAL,
            FEEDBACK_SUBMISSIONS_TOTAL,
            FEEDBACK_ENTRIES_TOTAL,
            REPORTS_GENERATED_TOTAL,
            ROSTER_IMPORTS_TOTAL,
        ];
        for name in names {
            assert!(name.starts_with("campus_pulse_"), "{}", name);
        }
    }

    #[test]
    fn test_register_without_recorder_is_safe() {
        // Describing metrics with no recorder installed is a no-op.
        register_metrics();
    }
}
