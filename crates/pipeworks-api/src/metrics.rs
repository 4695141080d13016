//! Prometheus metrics for the HTTP surface.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install prometheus recorder")
}

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "pipeworks_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pipeworks_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pipeworks_http_requests_in_flight";
}

fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [("method", method.to_string()), ("path", sanitize_path(path)), ("status", status.to_string())];
    metrics::counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Collapses path segments that vary per-request (episode ids, job ids) so the
/// cardinality of the `path` label stays bounded.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| if is_variable_segment(segment) { ":id" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_variable_segment(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let is_uuid_shaped = segment.len() >= 32 && segment.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    let is_episode_id_shaped = segment.contains('_') && segment.chars().any(|c| c.is_ascii_digit());
    is_uuid_shaped || is_episode_id_shaped
}

/// Tracks in-flight request count and records duration/status on completion.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_path_collapses_episode_and_job_ids() {
        assert_eq!(sanitize_path("/episodes/show_ep1_2024-01-01"), "/episodes/:id");
        assert_eq!(sanitize_path("/jobs/550e8400-e29b-41d4-a716-446655440000"), "/jobs/:id");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
