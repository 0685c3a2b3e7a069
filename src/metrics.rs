// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

// Macros for metrics when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

// Re-export macros for use in this module when observability is disabled
#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

use std::time::Duration;

/// Registers metric descriptions. Call once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "valuations_total",
        Unit::Count,
        "Valuation calls, labeled by kind (position, share) and outcome (ok or the error kind)."
    );
    describe_counter!(
        "valuation_pricing_branch_total",
        Unit::Count,
        "Price pairs built, labeled by branch (both_feeds, twap_token0, twap_token1)."
    );
    describe_counter!(
        "feed_registry_lookup_failures_total",
        Unit::Count,
        "Registry lookups that failed and were treated as no feed."
    );
    describe_histogram!(
        "valuation_duration_seconds",
        Unit::Seconds,
        "Wall time of a valuation call, all provider reads included."
    );
}

pub fn record_valuation(kind: &str, outcome: &str, duration: Duration) {
    counter!("valuations_total", 1, "kind" => kind.to_string(), "outcome" => outcome.to_string());
    histogram!("valuation_duration_seconds", duration.as_secs_f64(), "kind" => kind.to_string());
}

pub fn increment_pricing_branch(branch: &str) {
    counter!("valuation_pricing_branch_total", 1, "branch" => branch.to_string());
}

pub fn increment_registry_lookup_failure() {
    counter!("feed_registry_lookup_failures_total", 1);
}

/// Installs the Prometheus exporter listening on `addr`.
#[cfg(feature = "observability")]
pub fn install_prometheus_exporter(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus exporter: {}", e))?;
    describe_metrics();
    Ok(())
}
