//! Outbound call telemetry.
//!
//! Metric names, label sets and recording helpers for every HTTP attempt
//! made against the upstream rate provider. Consumers install their own
//! `metrics` recorder (e.g. prometheus); without a recorder installed, all
//! metric calls are no-ops.
//!
//! # Metrics
//!
//! - `http_client_request_duration_ms` (histogram): one sample per attempt,
//!   retried attempts included. Labels: `target`, `method`, `status`,
//!   `outcome`.
//! - `http_client_request_errors_total` (counter): one increment per failure
//!   that surfaces from the transport. Labels: `target`, `method`, `reason`.
//! - `http_client_retries_total` (counter): retries scheduled after a
//!   transient failure. Labels: `target`, `method`.
//! - `cambio_cache_hits_total` / `cambio_cache_misses_total` (counters).
//!   Labels: `operation`.

use std::fmt;
use std::time::Duration;

use crate::CambioError;

/// Latency of a single outbound attempt, in milliseconds.
///
/// Labels: `target`, `method`, `status`, `outcome`.
pub const REQUEST_DURATION_MS: &str = "http_client_request_duration_ms";

/// Failures surfaced by the transport after its retry budget.
///
/// Labels: `target`, `method`, `reason`.
pub const REQUEST_ERRORS_TOTAL: &str = "http_client_request_errors_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `target`, `method`.
pub const RETRIES_TOTAL: &str = "http_client_retries_total";

/// Total cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "cambio_cache_hits_total";

/// Total cache misses.
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "cambio_cache_misses_total";

/// Histogram bucket boundaries for [`REQUEST_DURATION_MS`].
pub const LATENCY_BUCKETS_MS: [f64; 9] = [
    50.0, 100.0, 200.0, 400.0, 800.0, 1500.0, 3000.0, 5000.0, 10000.0,
];

/// Categorical classification of an attempt's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Status below 400.
    Ok,
    /// Client error (400..500).
    Fail,
    /// Server error (>= 500) or no response at all.
    Error,
}

impl Outcome {
    /// Classify a status code; `0` means no response was received.
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => Self::Error,
            s if s >= 500 => Self::Error,
            s if s >= 400 => Self::Fail,
            _ => Self::Ok,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels attached to every latency observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels {
    pub target: String,
    pub method: String,
    /// Response status, `0` if no response was received.
    pub status: u16,
    pub outcome: Outcome,
}

impl RequestLabels {
    pub fn new(target: impl Into<String>, method: impl Into<String>, status: u16) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            status,
            outcome: Outcome::from_status(status),
        }
    }

    /// Record one latency sample for this attempt.
    pub fn record(&self, elapsed: Duration) {
        metrics::histogram!(REQUEST_DURATION_MS,
            "target" => self.target.clone(),
            "method" => self.method.clone(),
            "status" => self.status.to_string(),
            "outcome" => self.outcome.as_str(),
        )
        .record(elapsed.as_secs_f64() * 1000.0);
    }
}

/// Labels attached to the error counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLabels {
    pub target: String,
    pub method: String,
    pub reason: String,
}

impl ErrorLabels {
    pub fn from_error(
        target: impl Into<String>,
        method: impl Into<String>,
        error: &CambioError,
    ) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
            reason: error.reason(),
        }
    }

    /// Increment the error counter once.
    pub fn record(&self) {
        metrics::counter!(REQUEST_ERRORS_TOTAL,
            "target" => self.target.clone(),
            "method" => self.method.clone(),
            "reason" => self.reason.clone(),
        )
        .increment(1);
    }
}

pub(crate) fn record_retry(target: &str, method: &str) {
    metrics::counter!(RETRIES_TOTAL,
        "target" => target.to_owned(),
        "method" => method.to_owned(),
    )
    .increment(1);
}

pub(crate) fn record_cache_lookup(operation: &'static str, hit: bool) {
    if hit {
        metrics::counter!(CACHE_HITS_TOTAL, "operation" => operation).increment(1);
    } else {
        metrics::counter!(CACHE_MISSES_TOTAL, "operation" => operation).increment(1);
    }
}

/// Prometheus exporter builder with the latency buckets preconfigured.
///
/// Install it with `.install_recorder()` and render the returned handle
/// from the host application's `/metrics` route.
#[cfg(feature = "prometheus")]
pub fn prometheus_builder() -> crate::Result<metrics_exporter_prometheus::PrometheusBuilder> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_MS.to_owned()),
            &LATENCY_BUCKETS_MS,
        )
        .map_err(|e| crate::CambioError::Configuration(format!("invalid metric buckets: {e}")))
}
