use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub active_jobs: usize,
    pub queue_size: usize,
}

/// Cheap liveness/readiness check (§6): counts, not connectivity probes,
/// since the Registry and filesystem are local to this process.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.queue.stats();
    Json(HealthResponse { ok: true, active_jobs: stats.running, queue_size: stats.queued })
}
