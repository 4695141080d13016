use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pipeworks_models::{EpisodeFilter, JobParams, ProcessEpisodeParams, Stage};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Re-scans the configured source directory and registers any new media
/// files by content hash; idempotent.
pub async fn discover_episodes(State(state): State<AppState>) -> ApiResult<Json<pipeworks_pipeline::DiscoveryReport>> {
    let report = state.discovery.scan().await?;
    Ok(Json(report))
}

pub async fn get_episode(State(state): State<AppState>, Path(episode_id): Path<String>) -> ApiResult<Json<pipeworks_models::Episode>> {
    let episode = state.registry.get_episode(&episode_id).await?.ok_or_else(|| ApiError::NotFound(format!("episode {episode_id} not found")))?;
    Ok(Json(episode))
}

#[derive(Debug, Deserialize)]
pub struct ListEpisodesQuery {
    pub stage: Option<String>,
    pub show: Option<String>,
    pub limit: Option<u32>,
}

pub async fn list_episodes(State(state): State<AppState>, Query(query): Query<ListEpisodesQuery>) -> ApiResult<Json<Vec<pipeworks_models::Episode>>> {
    let stage = query.stage.map(|s| s.parse::<Stage>()).transpose().map_err(ApiError::Validation)?;
    let filter = EpisodeFilter { stage, show: query.show, limit: query.limit };
    let episodes = state.registry.list_episodes(filter).await?;
    Ok(Json(episodes))
}

pub async fn delete_episode(State(state): State<AppState>, Path(episode_id): Path<String>) -> ApiResult<StatusCode> {
    state.cleanup.delete_episode(&episode_id, false).await.map_err(|e| match e {
        pipeworks_registry::RegistryError::NotFound(m) => ApiError::NotFound(m),
        other => other.into(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SubmitProcessJobRequest {
    pub episode_id: String,
    pub target_stage: String,
    #[serde(default)]
    pub force_reprocess: bool,
    pub webhook_url: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

pub async fn submit_process_job(State(state): State<AppState>, Json(request): Json<SubmitProcessJobRequest>) -> ApiResult<(StatusCode, Json<SubmitJobResponse>)> {
    let target_stage = request.target_stage.parse::<Stage>().map_err(ApiError::Validation)?;

    let params = JobParams::ProcessEpisode(ProcessEpisodeParams {
        episode_id: request.episode_id,
        target_stage,
        force_reprocess: request.force_reprocess,
    });

    let job = state.queue.submit(params, request.webhook_url)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id: job.job_id.to_string() })))
}
