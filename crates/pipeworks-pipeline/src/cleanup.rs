use std::sync::Arc;

use pipeworks_artifacts::ArtifactStore;
use pipeworks_models::Stage;
use pipeworks_registry::{Registry, RegistryResult};

/// Cache invalidation and failed-episode cleanup (C11). The force-reprocess
/// pre-clean itself lives in `PipelineOrchestrator::run`, which shares the
/// same `ArtifactStore::cleanup_partial` primitive.
pub struct CleanupManager {
    registry: Registry,
    artifacts: Arc<ArtifactStore>,
}

impl CleanupManager {
    pub fn new(registry: Registry, artifacts: Arc<ArtifactStore>) -> Self {
        Self { registry, artifacts }
    }

    /// Deletes the episode's registry rows (cascading to clips/assets/log)
    /// and its on-disk artifact tree, optionally preserving transcripts.
    pub async fn delete_episode(&self, episode_id: &str, keep_transcripts: bool) -> RegistryResult<()> {
        let Some(episode) = self.registry.get_episode(episode_id).await? else {
            return Err(pipeworks_registry::RegistryError::NotFound(episode_id.to_string()));
        };
        let paths = self.artifacts.paths_for(&episode);
        self.registry.delete_episode(episode_id).await?;
        self.artifacts.cleanup_episode(&paths, keep_transcripts).await;
        Ok(())
    }

    /// Clears artifacts and resets stage for a job that failed partway
    /// through, so a retried submission starts from a clean slate rather
    /// than skip-if-present stale output.
    pub async fn clean_failed_run(&self, episode_id: &str, from_stage: Stage) -> RegistryResult<()> {
        let Some(episode) = self.registry.get_episode(episode_id).await? else {
            return Err(pipeworks_registry::RegistryError::NotFound(episode_id.to_string()));
        };
        let paths = self.artifacts.paths_for(&episode);
        self.artifacts.cleanup_partial(&paths, from_stage).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::{EpisodeDraft, EpisodeMetadata};
    use tempfile::TempDir;

    #[tokio::test]
    async fn delete_episode_removes_registry_row_and_artifact_tree() {
        let pool = pipeworks_registry::connect_in_memory().await.unwrap();
        let registry = Registry::new(pool);
        let dir = TempDir::new().unwrap();
        let artifacts = Arc::new(ArtifactStore::new(dir.path().to_string_lossy().to_string()));
        let manager = CleanupManager::new(registry.clone(), artifacts.clone());

        let episode = registry
            .register_episode(EpisodeDraft {
                episode_id: "ep1".into(),
                content_hash: "hash-1".into(),
                source_path: "in.mp4".into(),
                file_size: 1,
                duration_seconds: None,
                last_modified: chrono::Utc::now(),
                metadata: EpisodeMetadata::default(),
            })
            .await
            .unwrap();

        let paths = artifacts.paths_for(&episode);
        artifacts.write_bytes(&paths.html_dir.join("index.html"), b"x", true).await.unwrap();

        manager.delete_episode(&episode.episode_id, false).await.unwrap();

        assert!(registry.get_episode(&episode.episode_id).await.unwrap().is_none());
        assert!(tokio::fs::metadata(&paths.episode_dir).await.is_err());
    }
}
