//! Metrics and observability utilities
//!
//! Described Prometheus metrics with a shared `pressforge_` prefix and small
//! helpers that record them from the pipelines and the gateway.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PressForge metrics
pub const METRICS_PREFIX: &str = "pressforge";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00, 60.00,
];

/// Buckets for model calls, which routinely take tens of seconds
pub const LLM_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 90.0, 120.0];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_articles_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Article generation outcomes (created, existing, invalid_topic, failed)"
    );

    describe_counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total LLM completion requests"
    );

    describe_histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "LLM completion latency in seconds"
    );

    describe_counter!(
        format!("{}_images_resolved_total", METRICS_PREFIX),
        Unit::Count,
        "Image placeholders resolved, by source (generated, fallback)"
    );

    describe_counter!(
        format!("{}_image_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Placeholders left unresolved because no image was available"
    );

    describe_counter!(
        format!("{}_translations_total", METRICS_PREFIX),
        Unit::Count,
        "Translation fan-out results, by outcome (created, skipped)"
    );

    describe_counter!(
        format!("{}_search_records_synced_total", METRICS_PREFIX),
        Unit::Count,
        "Records pushed to the external search index"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record one LLM call
pub fn record_llm_call(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_llm_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_llm_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a generation outcome
pub fn record_generation(outcome: &'static str, lang: &str) {
    counter!(
        format!("{}_articles_generated_total", METRICS_PREFIX),
        "outcome" => outcome,
        "lang" => lang.to_string()
    )
    .increment(1);
}

/// Helper to record a resolved placeholder
pub fn record_image_resolution(source: &'static str) {
    counter!(
        format!("{}_images_resolved_total", METRICS_PREFIX),
        "source" => source
    )
    .increment(1);
}

pub fn record_image_failure() {
    counter!(format!("{}_image_failures_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record a translation fan-out
pub fn record_translations(created: usize, skipped: usize) {
    counter!(
        format!("{}_translations_total", METRICS_PREFIX),
        "outcome" => "created"
    )
    .increment(created as u64);

    counter!(
        format!("{}_translations_total", METRICS_PREFIX),
        "outcome" => "skipped"
    )
    .increment(skipped as u64);
}

pub fn record_search_sync(records: usize) {
    counter!(format!("{}_search_records_synced_total", METRICS_PREFIX)).increment(records as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, LLM_BUCKETS] {
            assert!(buckets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("POST", "/api/generate-content");
        metrics.finish(201);
        record_generation("created", "en");
        record_translations(2, 1);
        // No recorder installed: all calls are no-ops
    }
}
