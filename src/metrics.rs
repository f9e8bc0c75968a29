//! Prometheus metrics for Curio.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides a Tower-compatible middleware for
//! HTTP RED metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "curio_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "curio_http_request_duration_seconds";

/// Total objects created (counter).
pub const OBJECTS_CREATED_TOTAL: &str = "curio_objects_created_total";

/// Total objects deleted (counter).
pub const OBJECTS_DELETED_TOTAL: &str = "curio_objects_deleted_total";

/// Currently connected event subscribers (gauge).
pub const EVENT_SUBSCRIBERS: &str = "curio_event_subscribers";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent -- safe to call
/// multiple times (e.g. in tests). Returns a reference to the global handle.
pub fn init_metrics() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    })
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(OBJECTS_CREATED_TOTAL, "Total objects created");
    describe_counter!(OBJECTS_DELETED_TOTAL, "Total objects deleted");
    describe_gauge!(EVENT_SUBSCRIBERS, "Currently connected event subscribers");
}

// -- Domain metric helpers ----------------------------------------------------

/// Record one successful object creation.
pub fn count_object_created() {
    counter!(OBJECTS_CREATED_TOTAL).increment(1);
}

/// Record one successful object deletion.
pub fn count_object_deleted() {
    counter!(OBJECTS_DELETED_TOTAL).increment(1);
}

/// Publish the current subscriber count.
pub fn gauge_subscribers(count: usize) {
    gauge!(EVENT_SUBSCRIBERS).set(count as f64);
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation to avoid feedback loops.
/// Must be the outermost layer so it captures the full request lifecycle.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    // Do not instrument the metrics endpoint itself.
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Normalize an actual request path to a route template for metric labels.
///
/// This prevents high-cardinality labels from unique object ids.
///
/// Examples:
/// - `/objects` -> `/objects`
/// - `/objects/3f2a...` -> `/objects/{id}`
/// - `/events`, `/health`, `/metrics`, `/openapi.json` -> themselves
fn normalize_path(path: &str) -> String {
    match path {
        "/" | "/objects" | "/events" | "/health" | "/metrics" | "/openapi.json" => {
            path.to_string()
        }
        _ if path.starts_with("/objects/") => "/objects/{id}".to_string(),
        other => other.to_string(),
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus recorder not initialized");
    let body = handle.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_static_routes() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(normalize_path("/objects"), "/objects");
        assert_eq!(normalize_path("/events"), "/events");
        assert_eq!(normalize_path("/openapi.json"), "/openapi.json");
    }

    #[test]
    fn test_normalize_path_object_ids() {
        assert_eq!(
            normalize_path("/objects/1b4e28ba-2fa1-11d2-883f-0016d3cca427"),
            "/objects/{id}"
        );
        assert_eq!(normalize_path("/objects/whatever"), "/objects/{id}");
    }
}
