// Service exports
pub mod api_client;
pub mod metrics;

pub use api_client::{ApiClient, ApiError, SwipeApi};
pub use metrics::{install_prometheus, MetricsSink, NoopMetrics, PrometheusMetrics};
