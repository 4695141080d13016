use std::path::Path;

use pipeworks_models::Stage;
use tokio::fs;
use uuid::Uuid;

use crate::error::ArtifactResult;
use crate::paths::{self, ArtifactPaths};

/// Thin filesystem manager layered over NamingService (C4). Writes are
/// atomic (sibling temp file + rename); cleanup failures are logged, never
/// propagated, per §4.4.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn paths_for(&self, episode: &pipeworks_models::Episode) -> ArtifactPaths {
        paths::paths_for(&self.root, episode)
    }

    /// Write `bytes` to `path`. When `atomic`, the write lands in a sibling
    /// temp file first and is renamed into place so readers never observe a
    /// partial file, matching the cross-device-aware move pattern used
    /// elsewhere in the pipeline for relocating finished outputs.
    pub async fn write_bytes(&self, path: &Path, bytes: &[u8], atomic: bool) -> ArtifactResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if !atomic {
            fs::write(path, bytes).await?;
            return Ok(());
        }

        let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp_path, bytes).await?;
        match fs::rename(&tmp_path, path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(e.into())
            }
        }
    }

    /// Remove the episode's clips/outputs/social subtree, optionally
    /// preserving transcripts.
    pub async fn cleanup_episode(&self, paths: &ArtifactPaths, keep_transcripts: bool) {
        remove_dir_best_effort(&paths.episode_dir).await;
        if !keep_transcripts {
            remove_file_best_effort(&paths.transcript_txt).await;
            remove_file_best_effort(&paths.transcript_json).await;
            remove_file_best_effort(&paths.transcript_vtt).await;
        }
    }

    /// Delete artifacts produced at-or-after `from_stage`, used before a
    /// forced re-run (§4.4, invariant 2's force-reprocess escape hatch).
    pub async fn cleanup_partial(&self, paths: &ArtifactPaths, from_stage: Stage) {
        if from_stage <= Stage::Transcribed {
            remove_file_best_effort(&paths.transcript_txt).await;
            remove_file_best_effort(&paths.transcript_json).await;
            remove_file_best_effort(&paths.transcript_vtt).await;
        }
        if from_stage <= Stage::Rendered {
            remove_dir_best_effort(&paths.html_dir).await;
        }
        if from_stage <= Stage::ClipsDiscovered {
            remove_dir_best_effort(&paths.clips_dir).await;
            remove_dir_best_effort(&paths.social_dir).await;
        }
    }
}

async fn remove_dir_best_effort(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact directory");
        }
    }
}

async fn remove_file_best_effort(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_bytes_atomic_leaves_no_temp_file_on_success() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_string_lossy().to_string());
        let target = dir.path().join("sub").join("out.txt");

        store.write_bytes(&target, b"hello", true).await.unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), b"hello");
        let mut entries = fs::read_dir(target.parent().unwrap()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1, "temp file should not survive a successful atomic write");
    }

    #[tokio::test]
    async fn cleanup_partial_at_rendered_preserves_transcripts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_string_lossy().to_string());
        let episode = sample_episode();
        let paths = store.paths_for(&episode);

        store.write_bytes(&paths.transcript_txt, b"t", true).await.unwrap();
        store.write_bytes(&paths.html_dir.join("index.html"), b"<html/>", true).await.unwrap();

        store.cleanup_partial(&paths, Stage::Rendered).await;

        assert!(fs::metadata(&paths.transcript_txt).await.is_ok());
        assert!(fs::metadata(&paths.html_dir).await.is_err());
    }

    #[tokio::test]
    async fn cleanup_partial_at_transcribed_also_clears_transcripts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_string_lossy().to_string());
        let episode = sample_episode();
        let paths = store.paths_for(&episode);

        store.write_bytes(&paths.transcript_txt, b"t", true).await.unwrap();
        store.cleanup_partial(&paths, Stage::Transcribed).await;

        assert!(fs::metadata(&paths.transcript_txt).await.is_err());
    }

    fn sample_episode() -> pipeworks_models::Episode {
        pipeworks_models::Episode {
            episode_id: "show_ep1_2024-01-01".into(),
            content_hash: "h".into(),
            source_path: "in.mp4".into(),
            file_size: 1,
            duration_seconds: None,
            last_modified: chrono::Utc::now(),
            stage: Stage::Discovered,
            metadata: pipeworks_models::EpisodeMetadata { show_name: Some("Show".into()), ..Default::default() },
            transcription: None,
            enrichment: None,
            error: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }
}
