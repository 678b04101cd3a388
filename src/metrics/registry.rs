// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, GaugeVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_gauge_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of HTTP requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // PERPLEXITY API METRICS
    // ============================================================================

    /// Total Perplexity API calls
    pub static ref PERPLEXITY_API_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("perplexity_api_calls_total", "Total Perplexity API calls"),
        &["endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    /// Perplexity API call duration
    pub static ref PERPLEXITY_API_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("perplexity_api_duration_seconds", "Perplexity API call duration")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["endpoint"],
        REGISTRY
    ).unwrap();

    /// Responses served with fallback data because the content was not JSON
    pub static ref INTELLIGENCE_DEGRADED: CounterVec = register_counter_vec_with_registry!(
        Opts::new("intelligence_degraded_total", "Intelligence responses built from fallback data"),
        &["endpoint"],
        REGISTRY
    ).unwrap();

    /// Time spent waiting for a rate-limit slot
    pub static ref RATE_LIMIT_WAITS: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("rate_limit_wait_seconds", "Time spent waiting for a rate-limit slot")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0]),
        &["limiter"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, expired
        REGISTRY
    ).unwrap();

    /// Current cache entries
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries"),
        &["type"], // type: intelligence
        REGISTRY
    ).unwrap();

    // ============================================================================
    // REPORT METRICS
    // ============================================================================

    /// PDF generations by outcome
    pub static ref PDF_GENERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("pdf_generations_total", "Total PDF report generations"),
        &["status"], // status: success, failure
        REGISTRY
    ).unwrap();

    /// PDF generation duration
    pub static ref PDF_GENERATION_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("pdf_generation_duration_seconds", "PDF report generation duration")
            .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["premium"],
        REGISTRY
    ).unwrap();

    /// Expired reports removed from disk
    pub static ref REPORTS_PURGED: CounterVec = register_counter_vec_with_registry!(
        Opts::new("reports_purged_total", "Expired reports removed from disk"),
        &["reason"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // BILLING METRICS
    // ============================================================================

    /// Stripe API calls
    pub static ref STRIPE_API_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("stripe_api_calls_total", "Total Stripe API calls"),
        &["operation", "status_code"],
        REGISTRY
    ).unwrap();

    /// Webhook events received
    pub static ref WEBHOOK_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("webhook_events_total", "Total Stripe webhook events"),
        &["event_type", "outcome"], // outcome: handled, unhandled, rejected
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
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
