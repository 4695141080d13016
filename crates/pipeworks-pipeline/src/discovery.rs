use std::path::{Path, PathBuf};

use pipeworks_models::{EpisodeDraft, EpisodeMetadata};
use pipeworks_naming::{NamingService, PathResolver};
use pipeworks_registry::{Registry, RegistryResult};
use tracing::{info, warn};

use crate::dedup::DedupIndex;

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "wav", "mp3", "m4a"];

/// The outcome of one `DiscoverEpisodes` scan: how many files were newly
/// registered versus already known by content hash.
#[derive(Debug, Default, Clone, serde::Serialize, schemars::JsonSchema)]
pub struct DiscoveryReport {
    pub scanned: usize,
    pub registered: usize,
    pub already_known: Vec<String>,
}

/// Walks a source directory for media files and registers any whose
/// content hash is not already in the Registry (C8's collaborator on the
/// read side of the pipeline; the `DiscoverEpisodes` HTTP operation is a
/// thin wrapper around `scan`).
pub struct DiscoveryScanner {
    registry: Registry,
    resolver: PathResolver,
    naming: NamingService,
    source_dir: PathBuf,
}

impl DiscoveryScanner {
    pub fn new(registry: Registry, resolver: PathResolver, naming: NamingService, source_dir: impl Into<PathBuf>) -> Self {
        Self { registry, resolver, naming, source_dir: source_dir.into() }
    }

    /// Idempotent: re-running against an unchanged source directory
    /// registers nothing new.
    pub async fn scan(&self) -> RegistryResult<DiscoveryReport> {
        let mut report = DiscoveryReport::default();
        let mut stack = vec![self.source_dir.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "could not read discovery source directory");
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if !is_media_file(&path) {
                    continue;
                }

                report.scanned += 1;
                match self.register_one(&path).await {
                    Ok(RegisterOutcome::New(id)) => {
                        info!(episode_id = %id, path = %path.display(), "discovered new episode");
                        report.registered += 1;
                    }
                    Ok(RegisterOutcome::Known(id)) => report.already_known.push(id),
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to register discovered file"),
                }
            }
        }

        Ok(report)
    }

    async fn register_one(&self, path: &Path) -> RegistryResult<RegisterOutcome> {
        let hash = DedupIndex::hash_file(path).await.map_err(|e| pipeworks_registry::RegistryError::Validation(e.to_string()))?;

        if let Some(existing) = self.registry.find_by_hash(&hash).await? {
            return Ok(RegisterOutcome::Known(existing.episode_id));
        }

        let metadata = std::fs::metadata(path).map_err(|e| pipeworks_registry::RegistryError::Validation(e.to_string()))?;
        let file_size = metadata.len();
        let last_modified = metadata.modified().map(chrono::DateTime::<chrono::Utc>::from).unwrap_or_else(|_| chrono::Utc::now());

        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "episode".to_string());
        let episode_id = self.naming.generate_fallback_id(&stem, chrono::Utc::now());
        let source_path = self.resolver.normalize_for_storage(path);

        let draft = EpisodeDraft {
            episode_id: episode_id.clone(),
            content_hash: hash,
            source_path,
            file_size,
            duration_seconds: None,
            last_modified,
            metadata: EpisodeMetadata::default(),
        };

        let episode = self.registry.register_episode(draft).await?;
        Ok(RegisterOutcome::New(episode.episode_id))
    }
}

enum RegisterOutcome {
    New(String),
    Known(String),
}

fn is_media_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str())).unwrap_or(false)
}
