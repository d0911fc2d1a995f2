//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the romcheck server:
//! - HTTP request metrics (latency, counts)
//! - Verification outcomes and set-match queries
//! - Catalog changes and sizes (sizes collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "romcheck_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .expect("metric definition is valid")
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("romcheck_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("metric definition is valid")
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "romcheck_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .expect("metric definition is valid")
});

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Verifications by outcome (clean, findings, not_catalogued).
pub static VERIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("romcheck_verifications_total", "Archive verifications"),
        &["outcome"],
    )
    .expect("metric definition is valid")
});

/// Set-match queries answered.
pub static SET_MATCH_QUERIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "romcheck_set_match_queries_total",
        "Total set-match queries since startup",
    )
    .expect("metric definition is valid")
});

/// Catalog changes by operation (replace, remove).
pub static CATALOG_CHANGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("romcheck_catalog_changes_total", "Catalog entry changes"),
        &["operation"],
    )
    .expect("metric definition is valid")
});

// =============================================================================
// Sizes (collected dynamically)
// =============================================================================

/// Catalogued archives.
pub static CATALOG_ARCHIVES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("romcheck_catalog_archives", "Number of catalogued archives")
        .expect("metric definition is valid")
});

/// Reference records loaded.
pub static REFERENCE_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "romcheck_reference_records",
        "Number of records in the reference index",
    )
    .expect("metric definition is valid")
});

/// Catalog worker running state (1 = running, 0 = stopped).
pub static WORKER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "romcheck_catalog_worker_running",
        "Whether the catalog worker is running (1) or stopped (0)",
    )
    .expect("metric definition is valid")
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // Reconciliation
        Box::new(VERIFICATIONS_TOTAL.clone()),
        Box::new(SET_MATCH_QUERIES_TOTAL.clone()),
        Box::new(CATALOG_CHANGES_TOTAL.clone()),
        // Sizes
        Box::new(CATALOG_ARCHIVES.clone()),
        Box::new(REFERENCE_RECORDS.clone()),
        Box::new(WORKER_RUNNING.clone()),
    ];
    for metric in metrics {
        if let Err(e) = registry.register(metric) {
            error!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the size gauges reflect current values.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    CATALOG_ARCHIVES.set(state.catalog().stats().archive_count as i64);
    REFERENCE_RECORDS.set(state.reference().len() as i64);
    WORKER_RUNNING.set(match state.worker() {
        Some(worker) if worker.is_running() => 1,
        _ => 0,
    });
}

static ARCHIVE_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(/api/v1/(?:reference/archive|catalog/archive|verify))/.+$")
        .expect("route pattern is valid")
});

static HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").expect("hash pattern is valid"));

/// Normalize a path for metric labels (replace archive ids and checksums
/// with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = ARCHIVE_ROUTE.replace(path, "$1/{archive}");
    HASH.replace_all(&result, "{hash}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_archive() {
        assert_eq!(
            normalize_path("/api/v1/verify/mame/pacman"),
            "/api/v1/verify/{archive}"
        );
        assert_eq!(
            normalize_path("/api/v1/catalog/archive/mame/pacman"),
            "/api/v1/catalog/archive/{archive}"
        );
        assert_eq!(
            normalize_path("/api/v1/reference/archive/pacman"),
            "/api/v1/reference/archive/{archive}"
        );
    }

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/reference/checksum/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/reference/checksum/{hash}");
    }

    #[test]
    fn test_normalize_path_archive_named_like_hash() {
        let path = "/api/v1/verify/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/verify/{archive}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/catalog"), "/api/v1/catalog");
        assert_eq!(
            normalize_path("/api/v1/reference/archives"),
            "/api/v1/reference/archives"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("romcheck_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs labelled metrics that have been accessed
        VERIFICATIONS_TOTAL.with_label_values(&["clean"]).inc();
        CATALOG_CHANGES_TOTAL.with_label_values(&["replace"]).inc();
        SET_MATCH_QUERIES_TOTAL.inc();
        CATALOG_ARCHIVES.set(0);
        REFERENCE_RECORDS.set(0);
        WORKER_RUNNING.set(0);

        let output = encode_metrics();
        for name in [
            "romcheck_verifications_total",
            "romcheck_set_match_queries_total",
            "romcheck_catalog_changes_total",
            "romcheck_catalog_archives",
            "romcheck_reference_records",
            "romcheck_catalog_worker_running",
        ] {
            assert!(output.contains(name), "missing {}", name);
        }
    }
}
