//! Prometheus metrics collection.
//!
//! Besides HTTP traffic, every store round trip issued by the query engine is
//! counted by entity, query shape and fetch mode. Comparing
//! `store_queries_total{query="resolve"}` between eager and lazy runs is how
//! the N+1 cost shows up in a benchmark.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Store query labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct QueryLabels {
    /// Table the query targets.
    pub entity: String,
    /// Query shape: page, count, get, exists, resolve, write, delete.
    pub query: String,
    /// Fetch mode in effect.
    pub fetch: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/route/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// HTTP request duration histogram.
    pub http_duration_seconds: Family<HttpLabels, Histogram>,

    /// Store round trips by entity/shape/mode.
    pub store_queries: Family<QueryLabels, Counter>,

    /// Store round-trip duration.
    pub store_query_duration_seconds: Family<QueryLabels, Histogram>,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let store_queries = Family::<QueryLabels, Counter>::default();
        registry.register(
            "store_queries",
            "Store round trips issued by the query engine",
            store_queries.clone(),
        );

        let store_query_duration_seconds =
            Family::<QueryLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0001, 2.0, 14))
            });
        registry.register(
            "store_query_duration_seconds",
            "Store round-trip duration in seconds",
            store_query_duration_seconds.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            store_queries,
            store_query_duration_seconds,
        }
    }

    /// Record an HTTP request under its route template.
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: route.to_string(),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record one store round trip.
    pub fn record_query(&self, entity: &str, query: &str, fetch: &str, duration_secs: f64) {
        let labels = QueryLabels {
            entity: entity.to_string(),
            query: query.to_string(),
            fetch: fetch.to_string(),
        };

        self.store_queries.get_or_create(&labels).inc();
        self.store_query_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Round trips recorded so far for one label set.
    pub fn query_count(&self, entity: &str, query: &str, fetch: &str) -> u64 {
        let labels = QueryLabels {
            entity: entity.to_string(),
            query: query.to_string(),
            fetch: fetch.to_string(),
        };
        self.store_queries.get_or_create(&labels).get()
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        metrics.record_request("GET", "/items/{id}", 200, 0.01);
        let output = metrics.encode();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("# TYPE store_queries counter"));
    }

    #[test]
    fn test_record_query_counts() {
        let metrics = Metrics::new();
        metrics.record_query("item", "page", "lazy", 0.001);
        metrics.record_query("item", "resolve", "lazy", 0.001);
        metrics.record_query("item", "resolve", "lazy", 0.001);

        assert_eq!(metrics.query_count("item", "page", "lazy"), 1);
        assert_eq!(metrics.query_count("item", "resolve", "lazy"), 2);
        assert_eq!(metrics.query_count("item", "resolve", "eager"), 0);

        let output = metrics.encode();
        assert!(output.contains("query=\"resolve\""));
    }
}
