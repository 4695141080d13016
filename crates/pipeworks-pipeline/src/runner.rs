use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeworks_artifacts::ArtifactStore;
use pipeworks_models::{CancellationToken, Episode, LogEvent, ProgressCallback, Stage};
use pipeworks_registry::Registry;

use crate::executor::StageExecutor;
use crate::outcome::StageOutcome;

const PROGRESS_THROTTLE: Duration = Duration::from_millis(250);

/// Dispatches to the registered `StageExecutor` for a stage, applying its
/// skip-if-present/force semantics and persisting the result through one
/// retrying code path (§4.5).
pub struct StageRunner {
    executors: Vec<Arc<dyn StageExecutor>>,
    registry: Registry,
    artifacts: Arc<ArtifactStore>,
}

impl StageRunner {
    pub fn new(executors: Vec<Arc<dyn StageExecutor>>, registry: Registry, artifacts: Arc<ArtifactStore>) -> Self {
        Self { executors, registry, artifacts }
    }

    fn executor_for(&self, stage: Stage) -> Option<&Arc<dyn StageExecutor>> {
        self.executors.iter().find(|e| e.stage() == stage)
    }

    /// Runs one stage for `episode`, returning the refreshed episode on
    /// `Completed`/`Skipped`. The caller (PipelineOrchestrator) owns
    /// sequencing across stages.
    pub async fn run_stage(
        &self,
        episode: &Episode,
        stage: Stage,
        force: bool,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Episode) {
        let Some(executor) = self.executor_for(stage) else {
            return (StageOutcome::Failed(format!("no executor registered for stage {stage}")), episode.clone());
        };

        if !force && episode.has_output_for(stage) {
            return (StageOutcome::Skipped, episode.clone());
        }

        if cancel.is_cancelled() {
            return (StageOutcome::Cancelled, episode.clone());
        }

        let paths = self.artifacts.paths_for(episode);
        let started = Instant::now();
        let throttled = throttle_progress(on_progress);

        let (outcome, patch) = executor.run(episode, &paths, throttled, cancel).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            StageOutcome::Completed => {
                let patch = patch.unwrap_or_default();
                let updated = match self.registry.update_episode(&episode.episode_id, patch).await {
                    Ok(e) => e,
                    Err(e) => return (StageOutcome::Failed(e.to_string()), episode.clone()),
                };
                let _ = self.registry.append_log(&episode.episode_id, stage, LogEvent::Completed, Some(duration_ms), None).await;
                (StageOutcome::Completed, updated)
            }
            StageOutcome::Skipped => {
                let _ = self.registry.append_log(&episode.episode_id, stage, LogEvent::Skipped, Some(duration_ms), None).await;
                (StageOutcome::Skipped, episode.clone())
            }
            StageOutcome::Cancelled => {
                let _ = self.registry.append_log(&episode.episode_id, stage, LogEvent::Failed, Some(duration_ms), Some("cancelled")).await;
                (StageOutcome::Cancelled, episode.clone())
            }
            StageOutcome::Failed(message) => {
                let patch = pipeworks_models::EpisodePatch { error: Some(Some(message.clone())), ..Default::default() };
                let updated = self.registry.update_episode(&episode.episode_id, patch).await.unwrap_or_else(|_| episode.clone());
                let _ = self.registry.append_log(&episode.episode_id, stage, LogEvent::Failed, Some(duration_ms), Some(message)).await;
                (StageOutcome::Failed(message.clone()), updated)
            }
        }
    }
}

/// Wraps a progress callback so at most one update passes through per
/// `PROGRESS_THROTTLE` window, per §4.5's "~250ms" rate limit.
fn throttle_progress(inner: ProgressCallback) -> ProgressCallback {
    let last = std::sync::Mutex::new(Instant::now() - PROGRESS_THROTTLE);
    Arc::new(move |pct, message| {
        let mut guard = last.lock().expect("progress throttle mutex poisoned");
        let now = Instant::now();
        if pct == 100 || now.duration_since(*guard) >= PROGRESS_THROTTLE {
            *guard = now;
            inner(pct, message);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_collab::StubMediaProbe;
    use pipeworks_models::{noop_progress, EpisodeDraft, EpisodeMetadata};
    use tempfile::TempDir;

    async fn runner_with_prep() -> (StageRunner, Episode) {
        let pool = pipeworks_registry::connect_in_memory().await.unwrap();
        let registry = Registry::new(pool);
        let episode = registry
            .register_episode(EpisodeDraft {
                episode_id: "ep1".into(),
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
        let prep = Arc::new(crate::executor::PrepExecutor::new(Arc::new(StubMediaProbe { duration_seconds: 42.0 })));
        let runner = StageRunner::new(vec![prep], registry, artifacts);
        (runner, episode)
    }

    #[tokio::test]
    async fn run_stage_completes_and_advances_episode() {
        let (runner, episode) = runner_with_prep().await;
        let (outcome, updated) = runner.run_stage(&episode, Stage::Prepared, false, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, StageOutcome::Completed));
        assert_eq!(updated.stage, Stage::Prepared);
        assert_eq!(updated.duration_seconds, Some(42.0));
    }

    #[tokio::test]
    async fn run_stage_skips_when_output_already_present() {
        let (runner, episode) = runner_with_prep().await;
        let (_, advanced) = runner.run_stage(&episode, Stage::Prepared, false, noop_progress(), CancellationToken::new()).await;
        let (outcome, _) = runner.run_stage(&advanced, Stage::Prepared, false, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, StageOutcome::Skipped));
    }

    #[tokio::test]
    async fn run_stage_honors_pre_cancelled_token() {
        let (runner, episode) = runner_with_prep().await;
        let token = CancellationToken::new();
        token.cancel();
        let (outcome, _) = runner.run_stage(&episode, Stage::Prepared, false, noop_progress(), token).await;
        assert!(matches!(outcome, StageOutcome::Cancelled));
    }
}
