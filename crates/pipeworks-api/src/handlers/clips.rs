use axum::extract::{Path, State};
use axum::Json;
use pipeworks_models::{noop_progress, CancellationToken, Clip, DiscoverClipsParams};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoverClipsRequest {
    #[serde(default = "default_max_clips")]
    pub max_clips: u32,
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

impl Default for DiscoverClipsRequest {
    fn default() -> Self {
        Self {
            max_clips: default_max_clips(),
            min_duration_ms: default_min_duration_ms(),
            max_duration_ms: default_max_duration_ms(),
            score_threshold: default_score_threshold(),
        }
    }
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

/// Runs clip discovery inline rather than through the queue: segmentation
/// over an already-transcribed episode finishes well under the request
/// timeout, so there is no progress to poll for.
pub async fn discover_clips(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
    body: Option<Json<DiscoverClipsRequest>>,
) -> ApiResult<Json<Vec<Clip>>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let params = DiscoverClipsParams {
        episode_id: episode_id.clone(),
        max_clips: request.max_clips,
        min_duration_ms: request.min_duration_ms,
        max_duration_ms: request.max_duration_ms,
        score_threshold: request.score_threshold,
    };

    state.clip_discovery.run(&params, noop_progress(), CancellationToken::new()).await.map_err(ApiError::Validation)?;

    let clips = state.registry.list_clips(&episode_id).await?;
    Ok(Json(clips))
}

pub async fn list_clips(State(state): State<AppState>, Path(episode_id): Path<String>) -> ApiResult<Json<Vec<Clip>>> {
    let clips = state.registry.list_clips(&episode_id).await?;
    Ok(Json(clips))
}
