// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    PERPLEXITY_API_CALLS,
    PERPLEXITY_API_DURATION,
    INTELLIGENCE_DEGRADED,
    RATE_LIMIT_WAITS,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
    PDF_GENERATIONS,
    PDF_GENERATION_DURATION,
    REPORTS_PURGED,
    STRIPE_API_CALLS,
    WEBHOOK_EVENTS,
};

/// Helper to record request metrics
pub fn record_request(method: &str, endpoint: &str, status_code: u16, duration_secs: f64) {
    let status = status_code.to_string();
    REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[method, endpoint, &status])
        .observe(duration_secs);
}

/// Helper to record Perplexity API call metrics
pub fn record_perplexity_call(endpoint: &str, status: &str, duration_secs: f64) {
    PERPLEXITY_API_CALLS
        .with_label_values(&[endpoint, status])
        .inc();

    PERPLEXITY_API_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

pub fn record_degraded_parse(endpoint: &str) {
    INTELLIGENCE_DEGRADED.with_label_values(&[endpoint]).inc();
}

pub fn record_rate_limit_wait(seconds: f64) {
    RATE_LIMIT_WAITS.with_label_values(&["perplexity"]).observe(seconds);
}

/// Helper to record intelligence cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_expired(count: usize) {
    if count > 0 {
        CACHE_OPERATIONS
            .with_label_values(&["expired"])
            .inc_by(count as f64);
    }
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["intelligence"]).set(count as f64);
}

/// Helper to record PDF generation metrics
pub fn record_pdf_generation(success: bool, premium: bool, duration_secs: f64) {
    let status = if success { "success" } else { "failure" };
    PDF_GENERATIONS.with_label_values(&[status]).inc();

    if success {
        PDF_GENERATION_DURATION
            .with_label_values(&[&premium.to_string()])
            .observe(duration_secs);
    }
}

pub fn record_reports_purged(count: usize) {
    if count > 0 {
        REPORTS_PURGED
            .with_label_values(&["expired"])
            .inc_by(count as f64);
    }
}

/// Helper to record Stripe metrics
pub fn record_stripe_call(operation: &str, status: &str) {
    STRIPE_API_CALLS.with_label_values(&[operation, status]).inc();
}

pub fn record_webhook_event(event_type: &str, outcome: &str) {
    WEBHOOK_EVENTS.with_label_values(&[event_type, outcome]).inc();
}
