//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Sessions**: Token refreshes by path and outcome
//! - **Gateway**: Brokerage requests by operation and outcome
//! - **Scheduling**: Order attempts and job runs
//! - **Relay**: Frames, drops and pruned sinks (recorded by `kis-stream-relay`)
//!
//! Metrics are exposed at `/metrics` on the API port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls return the first handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "brokerage_token_refresh_total",
        "Token refreshes by path (primary, direct) and outcome"
    );
    describe_counter!(
        "brokerage_gateway_requests_total",
        "Brokerage requests by operation and outcome"
    );
    describe_counter!(
        "brokerage_scheduled_attempts_total",
        "Scheduled order attempts by side and outcome"
    );
    describe_counter!(
        "brokerage_scheduled_skips_total",
        "Scheduled plans deferred because the slice buys zero shares"
    );
    describe_counter!(
        "brokerage_job_runs_total",
        "Scheduler job runs by job and outcome"
    );
    describe_counter!(
        "kis_relay_frames_total",
        "Upstream frames by kind (event, control, unknown, invalid)"
    );
    describe_counter!(
        "kis_relay_events_dropped_total",
        "Events dropped because a sink was full"
    );
    describe_counter!(
        "kis_relay_sinks_pruned_total",
        "Downstream sinks removed after they closed"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a token refresh.
pub fn record_token_refresh(path: &'static str, success: bool) {
    counter!(
        "brokerage_token_refresh_total",
        "path" => path,
        "outcome" => outcome(success)
    )
    .increment(1);
}

/// Record a brokerage request.
pub fn record_gateway_request(operation: &'static str, success: bool) {
    counter!(
        "brokerage_gateway_requests_total",
        "operation" => operation,
        "outcome" => outcome(success)
    )
    .increment(1);
}

/// Record a scheduled order attempt.
pub fn record_scheduled_attempt(side: &'static str, success: bool) {
    counter!(
        "brokerage_scheduled_attempts_total",
        "side" => side,
        "outcome" => outcome(success)
    )
    .increment(1);
}

/// Record a deferred scheduled plan.
pub fn record_scheduled_skip() {
    counter!("brokerage_scheduled_skips_total").increment(1);
}

/// Record a scheduler job run.
pub fn record_job_run(job: &'static str, success: bool) {
    counter!(
        "brokerage_job_runs_total",
        "job" => job,
        "outcome" => outcome(success)
    )
    .increment(1);
}

const fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_token_refresh("direct", true);
        record_gateway_request("get_quote", false);
        record_scheduled_attempt("BUY", true);
        record_scheduled_skip();
        record_job_run("daily_buy_job", true);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome(true), "success");
        assert_eq!(outcome(false), "failure");
    }
}
