//! HTTP route table.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    cancel_job, delete_episode, discover_clips, discover_episodes, get_episode, get_job, health, list_clips, list_episodes, list_jobs, queue_stats, submit_discover_clips_job,
    submit_process_job, submit_render_clips_job,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let episode_routes = Router::new()
        .route("/episodes/discover", post(discover_episodes))
        .route("/episodes", get(list_episodes))
        .route("/episodes/:episode_id", get(get_episode))
        .route("/episodes/:episode_id", delete(delete_episode))
        .route("/episodes/:episode_id/clips", get(list_clips))
        .route("/episodes/:episode_id/clips/discover", post(discover_clips));

    let job_routes = Router::new()
        .route("/jobs/process", post(submit_process_job))
        .route("/jobs/render-clips", post(submit_render_clips_job))
        .route("/jobs/discover-clips", post(submit_discover_clips_job))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/cancel", post(cancel_job))
        .route("/jobs/stats", get(queue_stats));

    let api_routes = Router::new().merge(episode_routes).merge(job_routes);

    let health_routes = Router::new().route("/health", get(health));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
