use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pipeworks_models::{AspectRatio, ClipId, ClipVariant, DiscoverClipsParams, Job, JobId, JobParams, RenderClipsParams};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn parse_job_id(raw: &str) -> ApiResult<JobId> {
    JobId::from_str(raw).map_err(|_| ApiError::Validation(format!("malformed job id {raw}")))
}

pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<Json<Job>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.queue.get(job_id).ok_or_else(|| ApiError::NotFound(format!("job {job_id} not found")))?;
    Ok(Json(job))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.queue.list())
}

pub async fn cancel_job(State(state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state.queue.cancel(job_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SubmitRenderClipsRequest {
    pub episode_id: String,
    pub clip_ids: Option<Vec<ClipId>>,
    pub variants: Vec<ClipVariant>,
    pub aspect_ratios: Vec<AspectRatio>,
    #[serde(default)]
    pub force: bool,
    pub webhook_url: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

pub async fn submit_render_clips_job(State(state): State<AppState>, Json(request): Json<SubmitRenderClipsRequest>) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let params = JobParams::RenderClips(RenderClipsParams {
        episode_id: request.episode_id,
        clip_ids: request.clip_ids,
        variants: request.variants,
        aspect_ratios: request.aspect_ratios,
        force: request.force,
    });

    let job = state.queue.submit(params, request.webhook_url)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id: job.job_id.to_string() })))
}

#[derive(Debug, Deserialize)]
pub struct SubmitDiscoverClipsRequest {
    pub episode_id: String,
    #[serde(default = "default_max_clips")]
    pub max_clips: u32,
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    pub webhook_url: Option<String>,
}

fn default_max_clips() -> u32 {
    10
}
fn default_min_duration_ms() -> u64 {
    15_000
}
fn default_max_duration_ms() -> u64 {
    90_000
}
fn default_score_threshold() -> f32 {
    0.5
}

pub async fn submit_discover_clips_job(State(state): State<AppState>, Json(request): Json<SubmitDiscoverClipsRequest>) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let params = JobParams::DiscoverClips(DiscoverClipsParams {
        episode_id: request.episode_id,
        max_clips: request.max_clips,
        min_duration_ms: request.min_duration_ms,
        max_duration_ms: request.max_duration_ms,
        score_threshold: request.score_threshold,
    });

    let job = state.queue.submit(params, request.webhook_url)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id: job.job_id.to_string() })))
}

#[derive(Serialize)]
pub struct QueueStatsResponse {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub max_workers: usize,
}

pub async fn queue_stats(State(state): State<AppState>) -> Json<QueueStatsResponse> {
    let stats = state.queue.stats();
    Json(QueueStatsResponse {
        queued: stats.queued,
        running: stats.running,
        completed: stats.completed,
        failed: stats.failed,
        cancelled: stats.cancelled,
        max_workers: state.config.core.max_workers,
    })
}
