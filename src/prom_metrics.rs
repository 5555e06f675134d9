//! # Prometheus Metrics
//!
//! Exposes dashboard and upstream metrics in the Prometheus text exposition
//! format at `GET /metrics`.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `paymo_dashboard_http_request_duration_seconds` | Histogram | `method`, `path` | Dashboard request latency |
//! | `paymo_dashboard_upstream_requests_total` | Counter | `endpoint`, `outcome` | Requests sent to Paymo |
//! | `paymo_dashboard_rate_limit_retries_total` | Counter | - | Time lookups retried after HTTP 429 |
//! | `paymo_dashboard_time_lookup_fallbacks_total` | Counter | - | Time lookups that degraded to 0 seconds |

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for dashboard request latency. `path` is normalized so numeric
/// ids collapse into `:id`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Label set for upstream request counts.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UpstreamLabel {
    pub endpoint: String,
    pub outcome: String,
}

type HistogramFamily = Family<HttpLabel, Histogram, fn() -> Histogram>;

fn latency_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.005, 2.0, 14))
}

/// Thread-safe metrics registry shared by the router and every Paymo client.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: HistogramFamily,
    pub upstream_requests: Family<UpstreamLabel, Counter>,
    pub rate_limit_retries: Counter,
    pub time_lookup_fallbacks: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration: HistogramFamily =
            Family::new_with_constructor(latency_histogram as fn() -> Histogram);
        registry.register(
            "paymo_dashboard_http_request_duration_seconds",
            "Dashboard HTTP request latency",
            http_request_duration.clone(),
        );

        let upstream_requests = Family::<UpstreamLabel, Counter>::default();
        registry.register(
            "paymo_dashboard_upstream_requests",
            "Requests sent to the Paymo API by endpoint and outcome",
            upstream_requests.clone(),
        );

        let rate_limit_retries = Counter::default();
        registry.register(
            "paymo_dashboard_rate_limit_retries",
            "Time lookups retried after a rate-limit response",
            rate_limit_retries.clone(),
        );

        let time_lookup_fallbacks = Counter::default();
        registry.register(
            "paymo_dashboard_time_lookup_fallbacks",
            "Time lookups that failed and reported zero seconds",
            time_lookup_fallbacks.clone(),
        );

        Self {
            registry,
            http_request_duration,
            upstream_requests,
            rate_limit_retries,
            time_lookup_fallbacks,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
