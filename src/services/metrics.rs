//! Observability sink for the dispatch pipeline.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::models::Action;

/// Where the pipeline reports what it did
///
/// Recording never fails from the caller's point of view.
pub trait MetricsSink: Send + Sync {
    fn record_action(&self, action: Action);
    fn record_error(&self);
    fn record_match(&self);
    fn observe_latency(&self, seconds: f64);
}

/// Sink backed by the global `metrics` recorder
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsSink for PrometheusMetrics {
    fn record_action(&self, action: Action) {
        counter!("swipe_actions_total", "action" => action.as_str()).increment(1);
    }

    fn record_error(&self) {
        counter!("swipe_errors_total").increment(1);
    }

    fn record_match(&self) {
        counter!("matches_total").increment(1);
    }

    fn observe_latency(&self, seconds: f64) {
        histogram!("request_latency_seconds").record(seconds);
    }
}

/// Install the Prometheus recorder globally and return the handle used to render scrapes.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("swipe_actions_total", "Total swipe actions by type");
    metrics::describe_counter!("swipe_errors_total", "Total errors while swiping");
    metrics::describe_counter!("matches_total", "Total matches obtained");
    metrics::describe_histogram!("request_latency_seconds", "Latency of requests to the API");

    Ok(handle)
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_action(&self, _action: Action) {}
    fn record_error(&self) {}
    fn record_match(&self) {}
    fn observe_latency(&self, _seconds: f64) {}
}
