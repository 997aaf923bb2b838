//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - WooCommerce orders synced, by outcome
//! - Webhook jobs processed, by topic and outcome
//! - Job queue depth
//! - Shipment status transitions
//! - Database connection pool gauges

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "parcel_hub";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Storefront orders written by sync or webhooks
pub static WOO_ORDERS_SYNCED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("woo_orders_synced_total", "WooCommerce orders processed by outcome")
            .namespace(NAMESPACE),
        &["outcome"], // "created", "updated", "skipped", "failed"
    )
    .expect("Failed to create WOO_ORDERS_SYNCED_TOTAL metric")
});

/// Webhook jobs handled by workers
pub static WEBHOOK_JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webhook_jobs_total", "Webhook jobs by topic and outcome").namespace(NAMESPACE),
        &["topic", "outcome"], // "processed", "retried", "dead_lettered"
    )
    .expect("Failed to create WEBHOOK_JOBS_TOTAL metric")
});

/// Pending jobs per queue
pub static QUEUE_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("queue_depth", "Number of jobs waiting in a queue").namespace(NAMESPACE),
        &["queue"],
    )
    .expect("Failed to create QUEUE_DEPTH metric")
});

/// Shipment status changes
pub static SHIPMENT_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shipment_transitions_total", "Shipment status transitions by target status")
            .namespace(NAMESPACE),
        &["status"],
    )
    .expect("Failed to create SHIPMENT_TRANSITIONS_TOTAL metric")
});

/// Database connection pool stats
pub static DB_POOL_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("db_pool_connections", "Database connection pool statistics").namespace(NAMESPACE),
        &["state"], // "idle", "active"
    )
    .expect("Failed to create DB_POOL_CONNECTIONS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(WOO_ORDERS_SYNCED_TOTAL.clone()))
        .expect("Failed to register WOO_ORDERS_SYNCED_TOTAL");
    registry
        .register(Box::new(WEBHOOK_JOBS_TOTAL.clone()))
        .expect("Failed to register WEBHOOK_JOBS_TOTAL");
    registry
        .register(Box::new(QUEUE_DEPTH.clone()))
        .expect("Failed to register QUEUE_DEPTH");
    registry
        .register(Box::new(SHIPMENT_TRANSITIONS_TOTAL.clone()))
        .expect("Failed to register SHIPMENT_TRANSITIONS_TOTAL");
    registry
        .register(Box::new(DB_POOL_CONNECTIONS.clone()))
        .expect("Failed to register DB_POOL_CONNECTIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_order_synced(outcome: &str) {
    WOO_ORDERS_SYNCED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_webhook_job(topic: &str, outcome: &str) {
    WEBHOOK_JOBS_TOTAL.with_label_values(&[topic, outcome]).inc();
}

pub fn set_queue_depth(queue: &str, depth: u64) {
    QUEUE_DEPTH
        .with_label_values(&[queue])
        .set(depth.min(i64::MAX as u64) as i64);
}

pub fn record_shipment_transition(status: &str) {
    SHIPMENT_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Helper to update database pool stats
pub fn update_db_pool_stats(idle: usize, active: u32) {
    DB_POOL_CONNECTIONS
        .with_label_values(&["idle"])
        .set(idle as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["active"])
        .set(active as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_domain_metrics() {
        record_order_synced("created");
        record_webhook_job("order.updated", "processed");
        set_queue_depth("woo:webhooks", 3);
        record_shipment_transition("delivered");

        let metrics = gather_metrics();
        assert!(metrics.contains("parcel_hub_woo_orders_synced_total{outcome=\"created\"}"));
        assert!(metrics.contains("parcel_hub_webhook_jobs_total"));
        assert!(metrics.contains("parcel_hub_queue_depth{queue=\"woo:webhooks\"} 3"));
        assert!(metrics.contains("parcel_hub_shipment_transitions_total"));
    }

    #[test]
    fn records_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("parcel_hub_http_requests_total"));
    }
}
