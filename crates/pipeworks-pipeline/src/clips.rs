use std::sync::Arc;

use pipeworks_artifacts::ArtifactStore;
use pipeworks_collab::{ClipDiscoveryConfig, ClipSegmenter, VideoRenderer};
use pipeworks_models::{
    AspectRatio, CancellationToken, ClipAsset, ClipVariant, DiscoverClipsParams, ProgressCallback, RenderClipsParams,
};
use pipeworks_registry::{Registry, RegistryResult};

/// Runs clip discovery for an already-transcribed episode: calls the
/// segmentation collaborator and persists the resulting candidates as Clip
/// rows (the `discover_clips` job type; §6).
pub struct ClipDiscoveryJob {
    segmenter: Arc<dyn ClipSegmenter>,
    registry: Registry,
}

impl ClipDiscoveryJob {
    pub fn new(segmenter: Arc<dyn ClipSegmenter>, registry: Registry) -> Self {
        Self { segmenter, registry }
    }

    pub async fn run(
        &self,
        params: &DiscoverClipsParams,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<usize, String> {
        let episode = self
            .registry
            .get_episode(&params.episode_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("episode {} not found", params.episode_id))?;
        let transcript = episode.transcription.ok_or_else(|| "episode has no transcription yet".to_string())?;

        let config = ClipDiscoveryConfig {
            max_clips: params.max_clips,
            min_duration_ms: params.min_duration_ms,
            max_duration_ms: params.max_duration_ms,
            score_threshold: params.score_threshold,
        };

        let candidates = self.segmenter.discover_clips(&transcript, &config, progress, cancel).await.map_err(|e| e.to_string())?;
        let count = candidates.len();
        self.registry.insert_clips(&params.episode_id, candidates).await.map_err(|e| e.to_string())?;
        Ok(count)
    }
}

/// Renders every requested `(variant, aspect_ratio)` combination for the
/// clips named by a `render_clips` job submission, writing each asset
/// through `ArtifactStore` and recording it via `Registry::upsert_clip_asset`.
pub struct RenderClipsJob {
    renderer: Arc<dyn VideoRenderer>,
    registry: Registry,
    artifacts: Arc<ArtifactStore>,
}

impl RenderClipsJob {
    pub fn new(renderer: Arc<dyn VideoRenderer>, registry: Registry, artifacts: Arc<ArtifactStore>) -> Self {
        Self { renderer, registry, artifacts }
    }

    pub async fn run(
        &self,
        params: &RenderClipsParams,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<usize, String> {
        let episode = self
            .registry
            .get_episode(&params.episode_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("episode {} not found", params.episode_id))?;
        let source = std::path::Path::new(&episode.source_path);
        let paths = self.artifacts.paths_for(&episode);

        let all_clips = self.registry.list_clips(&params.episode_id).await.map_err(|e| e.to_string())?;
        let clips = match &params.clip_ids {
            Some(ids) => all_clips.into_iter().filter(|c| ids.contains(&c.clip_id)).collect::<Vec<_>>(),
            None => all_clips,
        };

        let combinations = Registry::variants_matrix(&params.variants, &params.aspect_ratios);
        let mut rendered = 0usize;

        for clip in &clips {
            for (variant, aspect) in &combinations {
                if cancel.is_cancelled() {
                    return Ok(rendered);
                }
                if !params.force && self.already_rendered(clip.clip_id, *variant, *aspect).await.map_err(|e| e.to_string())? {
                    continue;
                }
                let out_path = paths.clip_asset_path(clip.clip_id, *aspect, *variant);
                let result = self
                    .renderer
                    .render(source, clip.start_ms, clip.end_ms, *variant, *aspect, &out_path, progress.clone(), cancel.clone())
                    .await;

                let asset = match result {
                    Ok(()) => ClipAsset {
                        clip_id: clip.clip_id,
                        variant: *variant,
                        aspect_ratio: *aspect,
                        output_path: out_path.to_string_lossy().to_string(),
                        file_size: tokio::fs::metadata(&out_path).await.ok().map(|m| m.len()),
                        status: pipeworks_models::AssetStatus::Ready,
                    },
                    Err(_) => ClipAsset {
                        clip_id: clip.clip_id,
                        variant: *variant,
                        aspect_ratio: *aspect,
                        output_path: out_path.to_string_lossy().to_string(),
                        file_size: None,
                        status: pipeworks_models::AssetStatus::Failed,
                    },
                };
                self.registry.upsert_clip_asset(&asset).await.map_err(|e| e.to_string())?;
                if asset.status == pipeworks_models::AssetStatus::Ready {
                    rendered += 1;
                }
            }
        }

        Ok(rendered)
    }

    async fn already_rendered(&self, clip_id: pipeworks_models::ClipId, variant: ClipVariant, aspect: AspectRatio) -> RegistryResult<bool> {
        let assets = self.registry.list_clip_assets(clip_id).await?;
        Ok(assets.iter().any(|a| a.variant == variant && a.aspect_ratio == aspect && a.status == pipeworks_models::AssetStatus::Ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_collab::{StubRenderer, StubSegmenter};
    use pipeworks_models::{noop_progress, ClipCandidate, EpisodeDraft, EpisodeMetadata, Transcription};
    use tempfile::TempDir;

    async fn registry_with_transcribed_episode() -> (Registry, pipeworks_models::Episode) {
        let pool = pipeworks_registry::connect_in_memory().await.unwrap();
        let registry = Registry::new(pool);
        let episode = registry
            .register_episode(EpisodeDraft {
                episode_id: "ep1".into(),
                content_hash: "h".into(),
                source_path: "in.mp4".into(),
                file_size: 1,
                duration_seconds: None,
                last_modified: chrono::Utc::now(),
                metadata: EpisodeMetadata::default(),
            })
            .await
            .unwrap();
        let episode = registry
            .update_episode(&episode.episode_id, pipeworks_models::EpisodePatch { transcription: Some(Transcription { text: "hi".into(), ..Default::default() }), ..Default::default() })
            .await
            .unwrap();
        (registry, episode)
    }

    #[tokio::test]
    async fn clip_discovery_job_persists_candidates() {
        let (registry, episode) = registry_with_transcribed_episode().await;
        let job = ClipDiscoveryJob::new(Arc::new(StubSegmenter), registry.clone());
        let params = DiscoverClipsParams { episode_id: episode.episode_id.clone(), max_clips: 3, min_duration_ms: 1000, max_duration_ms: 90_000, score_threshold: 0.0 };

        let count = job.run(&params, noop_progress(), CancellationToken::new()).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(registry.list_clips(&episode.episode_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn render_clips_job_writes_assets_for_every_combination() {
        let (registry, episode) = registry_with_transcribed_episode().await;
        registry.insert_clips(&episode.episode_id, vec![ClipCandidate { start_ms: 0, end_ms: 5000, score: 0.8, metadata: Default::default() }]).await.unwrap();

        let dir = TempDir::new().unwrap();
        let artifacts = Arc::new(ArtifactStore::new(dir.path().to_string_lossy().to_string()));
        let job = RenderClipsJob::new(Arc::new(StubRenderer), registry.clone(), artifacts);

        let params = RenderClipsParams {
            episode_id: episode.episode_id.clone(),
            clip_ids: None,
            variants: vec![ClipVariant::Clean],
            aspect_ratios: vec![AspectRatio::Vertical, AspectRatio::Widescreen],
            force: false,
        };

        let rendered = job.run(&params, noop_progress(), CancellationToken::new()).await.unwrap();
        assert_eq!(rendered, 2);
    }
}
