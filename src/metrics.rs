//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Counter, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("medialodge_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "medialodge_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Storage metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "medialodge_media_uploads_total",
        "Total number of media uploads"
    ).expect("metric can be created");
    pub static ref MEDIA_BYTES_UPLOADED: Counter = Counter::new(
        "medialodge_media_bytes_uploaded_total",
        "Total bytes of media uploaded"
    ).expect("metric can be created");
    pub static ref THUMBNAILS_GENERATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("medialodge_thumbnails_generated_total", "Thumbnail generation outcomes"),
        &["outcome"]
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("medialodge_errors_total", "Total number of errors returned"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Register all instruments with the global registry.
///
/// Registration errors are ignored so repeated initialization
/// (multiple test servers in one process) stays harmless.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(MEDIA_UPLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MEDIA_BYTES_UPLOADED.clone()));
    let _ = REGISTRY.register(Box::new(THUMBNAILS_GENERATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
}
