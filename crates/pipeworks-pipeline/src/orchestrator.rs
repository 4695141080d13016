use std::sync::Arc;

use pipeworks_artifacts::ArtifactStore;
use pipeworks_models::{CancellationToken, Episode, EpisodePatch, ProgressCallback, Stage, StageWeights};
use pipeworks_naming::NamingService;
use pipeworks_registry::{Registry, RegistryError};

use crate::outcome::StageOutcome;
use crate::runner::StageRunner;

#[derive(Debug)]
pub enum OrchestratorOutcome {
    Completed(Episode),
    Failed(String, Episode),
    Cancelled(Episode),
}

/// Drives an episode from its current stage to `target_stage` through
/// `StageRunner`, emitting weighted overall progress and handling the
/// post-enrichment rename (§4.6, invariant 7).
pub struct PipelineOrchestrator {
    registry: Registry,
    artifacts: Arc<ArtifactStore>,
    runner: StageRunner,
    naming: NamingService,
    weights: StageWeights,
}

impl PipelineOrchestrator {
    pub fn new(registry: Registry, artifacts: Arc<ArtifactStore>, runner: StageRunner, naming: NamingService, weights: StageWeights) -> Self {
        Self { registry, artifacts, runner, naming, weights }
    }

    pub async fn run(
        &self,
        episode_id: &str,
        target_stage: Stage,
        force_reprocess: bool,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> OrchestratorOutcome {
        let mut episode = match self.registry.get_episode(episode_id).await {
            Ok(Some(e)) => e,
            Ok(None) => return OrchestratorOutcome::Failed(format!("episode {episode_id} not found"), episode_placeholder(episode_id)),
            Err(e) => return OrchestratorOutcome::Failed(e.to_string(), episode_placeholder(episode_id)),
        };

        if force_reprocess {
            let from_stage = Stage::ORDER.first().copied().unwrap_or(Stage::Discovered).next().unwrap_or(Stage::Prepared);
            let paths = self.artifacts.paths_for(&episode);
            self.artifacts.cleanup_partial(&paths, from_stage).await;
            episode = match self.registry.update_episode(episode_id, EpisodePatch { stage: Some(Stage::Discovered), error: Some(None), ..Default::default() }).await {
                Ok(e) => e,
                Err(e) => return OrchestratorOutcome::Failed(e.to_string(), episode),
            };
        }

        let stages = episode.stage.range_to(target_stage);
        if stages.is_empty() {
            on_progress(100, Some("already at target stage".into()));
            return OrchestratorOutcome::Completed(episode);
        }

        let total_weight: f64 = stages.iter().map(|s| self.weights.weight_for(*s)).sum::<f64>().max(f64::EPSILON);
        let mut accumulated = 0.0f64;

        for stage in stages {
            if cancel.is_cancelled() {
                return OrchestratorOutcome::Cancelled(episode);
            }

            let stage_weight = self.weights.weight_for(stage);
            let forwarder = {
                let on_progress = on_progress.clone();
                let accumulated = accumulated;
                let stage_weight = stage_weight;
                let total_weight = total_weight;
                Arc::new(move |pct: u8, message: Option<String>| {
                    let overall = accumulated + stage_weight * (pct as f64 / 100.0);
                    let overall_pct = ((overall / total_weight) * 100.0).clamp(0.0, 100.0) as u8;
                    on_progress(overall_pct, message);
                })
            };

            let (outcome, updated) = self.runner.run_stage(&episode, stage, force_reprocess, forwarder, cancel.clone()).await;
            episode = updated;

            match outcome {
                StageOutcome::Completed | StageOutcome::Skipped => {
                    accumulated += stage_weight;
                    let overall_pct = ((accumulated / total_weight) * 100.0).clamp(0.0, 100.0) as u8;
                    on_progress(overall_pct, Some(format!("{stage} done")));

                    if stage == Stage::Enriched {
                        episode = match self.maybe_rename(&episode).await {
                            Ok(e) => e,
                            Err(e) => return OrchestratorOutcome::Failed(e.to_string(), episode),
                        };
                    }
                }
                StageOutcome::Failed(message) => return OrchestratorOutcome::Failed(message, episode),
                StageOutcome::Cancelled => return OrchestratorOutcome::Cancelled(episode),
            }
        }

        OrchestratorOutcome::Completed(episode)
    }

    /// Recomputes the canonical ID from whatever enrichment/discovery has
    /// learned; renames the episode if it differs (invariant 7).
    async fn maybe_rename(&self, episode: &Episode) -> Result<Episode, RegistryError> {
        let (Some(show), Some(number), Some(date)) = (
            episode.metadata.show_name.as_deref(),
            episode.metadata.episode_number,
            episode.metadata.air_date,
        ) else {
            return Ok(episode.clone());
        };

        let canonical_show = self.naming.map_show(show);
        let new_id = self.naming.generate_episode_id(&canonical_show, number, date);
        if new_id == episode.episode_id {
            return Ok(episode.clone());
        }

        self.registry.rename_episode(&episode.episode_id, &new_id).await
    }
}

fn episode_placeholder(episode_id: &str) -> Episode {
    let now = chrono::Utc::now();
    Episode {
        episode_id: episode_id.to_string(),
        content_hash: String::new(),
        source_path: String::new(),
        file_size: 0,
        duration_seconds: None,
        last_modified: now,
        stage: Stage::Discovered,
        metadata: pipeworks_models::EpisodeMetadata::default(),
        transcription: None,
        enrichment: None,
        error: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_collab::{StubEnricher, StubMediaProbe, StubSttClient};
    use pipeworks_models::{noop_progress, EpisodeDraft, EpisodeMetadata};
    use tempfile::TempDir;

    async fn orchestrator_with_episode() -> (PipelineOrchestrator, Episode) {
        let pool = pipeworks_registry::connect_in_memory().await.unwrap();
        let registry = Registry::new(pool);
        let episode = registry
            .register_episode(EpisodeDraft {
                episode_id: "raw-source_1700000000".into(),
                content_hash: "hash-1".into(),
                source_path: "in.mp4".into(),
                file_size: 10,
                duration_seconds: None,
                last_modified: chrono::Utc::now(),
                metadata: EpisodeMetadata::default(),
            })
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let artifacts = Arc::new(ArtifactStore::new(dir.path().to_string_lossy().to_string()));

        let executors: Vec<Arc<dyn crate::executor::StageExecutor>> = vec![
            Arc::new(crate::executor::PrepExecutor::new(Arc::new(StubMediaProbe { duration_seconds: 60.0 }))),
            Arc::new(crate::executor::TranscriptionExecutor::new(Arc::new(StubSttClient::default()), artifacts.clone())),
            Arc::new(crate::executor::EnrichmentExecutor::new(Arc::new(StubEnricher))),
        ];
        let runner = StageRunner::new(executors, registry.clone(), artifacts.clone());
        let naming = NamingService::default();
        let orchestrator = PipelineOrchestrator::new(registry, artifacts, runner, naming, StageWeights::default());
        (orchestrator, episode)
    }

    #[tokio::test]
    async fn run_advances_episode_through_requested_stages() {
        let (orchestrator, episode) = orchestrator_with_episode().await;
        let outcome = orchestrator.run(&episode.episode_id, Stage::Transcribed, false, noop_progress(), CancellationToken::new()).await;
        match outcome {
            OrchestratorOutcome::Completed(updated) => assert_eq!(updated.stage, Stage::Transcribed),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_is_a_no_op_when_already_at_target() {
        let (orchestrator, episode) = orchestrator_with_episode().await;
        let outcome = orchestrator.run(&episode.episode_id, Stage::Discovered, false, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, OrchestratorOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn run_stops_on_pre_cancelled_token() {
        let (orchestrator, episode) = orchestrator_with_episode().await;
        let token = CancellationToken::new();
        token.cancel();
        let outcome = orchestrator.run(&episode.episode_id, Stage::Transcribed, false, noop_progress(), token).await;
        assert!(matches!(outcome, OrchestratorOutcome::Cancelled(_)));
    }
}
