use chrono::Utc;
use pipeworks_models::{
    Clip, ClipAsset, ClipCandidate, ClipId, ClipVariant, Episode, EpisodeDraft, EpisodeFilter, EpisodePatch,
    LogEvent, ProcessingLogEntry, Stage,
};
use sqlx::SqlitePool;

use crate::error::{RegistryError, RegistryResult};
use crate::retry::{with_retry, RetryPolicy};
use crate::rows::{
    aspect_str, clip_status_str, log_event_str, stage_str, variant_str, ClipAssetRow, ClipRow, EpisodeRow, LogRow,
};

/// Transactional persistence of episodes, clips, assets, and the
/// processing log (C3). Backed by SQLite in WAL mode; the owning process
/// must be the sole writer (§4.3, §5).
#[derive(Debug, Clone)]
pub struct Registry {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl Registry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, retry: RetryPolicy::default() }
    }

    /// Idempotent on repeated hash: a collision updates `source_path` on
    /// the existing row and returns it rather than creating a second one
    /// (invariant 1).
    pub async fn register_episode(&self, draft: EpisodeDraft) -> RegistryResult<Episode> {
        with_retry(&self.retry, "register_episode", || self.register_episode_once(&draft)).await
    }

    async fn register_episode_once(&self, draft: &EpisodeDraft) -> RegistryResult<Episode> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<EpisodeRow> =
            sqlx::query_as("SELECT * FROM episodes WHERE content_hash = ?").bind(&draft.content_hash).fetch_optional(&mut *tx).await?;

        if let Some(row) = existing {
            let episode_id = row.episode_id.clone();
            if row.source_path != draft.source_path {
                let now = Utc::now().to_rfc3339();
                sqlx::query("UPDATE episodes SET source_path = ?, updated_at = ? WHERE episode_id = ?")
                    .bind(&draft.source_path)
                    .bind(&now)
                    .bind(&episode_id)
                    .execute(&mut *tx)
                    .await?;
            }
            let refreshed: EpisodeRow =
                sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(&episode_id).fetch_one(&mut *tx).await?;
            tx.commit().await?;
            return refreshed.into_episode();
        }

        let now = Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&draft.metadata)?;
        sqlx::query(
            "INSERT INTO episodes (episode_id, content_hash, source_path, file_size, duration_seconds, \
             last_modified, stage, metadata, transcription, enrichment, error, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)",
        )
        .bind(&draft.episode_id)
        .bind(&draft.content_hash)
        .bind(&draft.source_path)
        .bind(draft.file_size as i64)
        .bind(draft.duration_seconds)
        .bind(draft.last_modified.to_rfc3339())
        .bind(stage_str(Stage::Discovered))
        .bind(&metadata)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let inserted: EpisodeRow =
            sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(&draft.episode_id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        inserted.into_episode()
    }

    pub async fn get_episode(&self, id: &str) -> RegistryResult<Option<Episode>> {
        let row: Option<EpisodeRow> = sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_episode()).transpose()
    }

    pub async fn find_by_hash(&self, hash: &str) -> RegistryResult<Option<Episode>> {
        let row: Option<EpisodeRow> =
            sqlx::query_as("SELECT * FROM episodes WHERE content_hash = ?").bind(hash).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_episode()).transpose()
    }

    /// Fallback lookup by bare filename stem, used when an HTTP caller
    /// supplies an inconsistent episode ID (§4.2).
    pub async fn find_by_filename(&self, name: &str) -> RegistryResult<Option<Episode>> {
        let stem = pipeworks_naming::PathResolver::filename_stem(name).unwrap_or_else(|| name.to_string());
        let pattern = format!("%{stem}%");
        let row: Option<EpisodeRow> =
            sqlx::query_as("SELECT * FROM episodes WHERE source_path LIKE ? ORDER BY created_at DESC LIMIT 1")
                .bind(pattern)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|r| r.into_episode()).transpose()
    }

    pub async fn list_episodes(&self, filter: EpisodeFilter) -> RegistryResult<Vec<Episode>> {
        let limit = filter.limit.unwrap_or(100) as i64;
        let rows: Vec<EpisodeRow> = match (&filter.stage, &filter.show) {
            (Some(stage), Some(show)) => {
                sqlx::query_as("SELECT * FROM episodes WHERE stage = ? AND json_extract(metadata, '$.show_name') = ? ORDER BY created_at DESC LIMIT ?")
                    .bind(stage_str(*stage))
                    .bind(show)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            (Some(stage), None) => {
                sqlx::query_as("SELECT * FROM episodes WHERE stage = ? ORDER BY created_at DESC LIMIT ?")
                    .bind(stage_str(*stage))
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            (None, Some(show)) => {
                sqlx::query_as("SELECT * FROM episodes WHERE json_extract(metadata, '$.show_name') = ? ORDER BY created_at DESC LIMIT ?")
                    .bind(show)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            (None, None) => {
                sqlx::query_as("SELECT * FROM episodes ORDER BY created_at DESC LIMIT ?").bind(limit).fetch_all(&self.pool).await?
            }
        };
        rows.into_iter().map(|r| r.into_episode()).collect()
    }

    pub async fn update_episode(&self, id: &str, patch: EpisodePatch) -> RegistryResult<Episode> {
        with_retry(&self.retry, "update_episode", || self.update_episode_once(id, &patch)).await
    }

    async fn update_episode_once(&self, id: &str, patch: &EpisodePatch) -> RegistryResult<Episode> {
        let mut tx = self.pool.begin().await?;
        let current: Option<EpisodeRow> = sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(id).fetch_optional(&mut *tx).await?;
        let Some(current) = current else {
            return Err(RegistryError::NotFound(id.to_string()));
        };

        let stage = patch.stage.map(stage_str).unwrap_or(current.stage);
        let source_path = patch.source_path.clone().unwrap_or(current.source_path);
        let duration_seconds = patch.duration_seconds.or(current.duration_seconds);
        let metadata = match &patch.metadata {
            Some(m) => serde_json::to_string(m)?,
            None => current.metadata,
        };
        let transcription = match &patch.transcription {
            Some(t) => Some(serde_json::to_string(t)?),
            None => current.transcription,
        };
        let enrichment = match &patch.enrichment {
            Some(e) => Some(serde_json::to_string(e)?),
            None => current.enrichment,
        };
        let error = match &patch.error {
            Some(e) => e.clone(),
            None => current.error,
        };
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE episodes SET stage = ?, source_path = ?, duration_seconds = ?, metadata = ?, \
             transcription = ?, enrichment = ?, error = ?, updated_at = ? WHERE episode_id = ?",
        )
        .bind(&stage)
        .bind(&source_path)
        .bind(duration_seconds)
        .bind(&metadata)
        .bind(&transcription)
        .bind(&enrichment)
        .bind(&error)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated: EpisodeRow = sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        updated.into_episode()
    }

    /// Renames the episode's primary key and cascades to clips and assets
    /// within one transaction. Fails atomically if `new_id` already exists
    /// (invariant 7).
    pub async fn rename_episode(&self, old_id: &str, new_id: &str) -> RegistryResult<Episode> {
        with_retry(&self.retry, "rename_episode", || self.rename_episode_once(old_id, new_id)).await
    }

    async fn rename_episode_once(&self, old_id: &str, new_id: &str) -> RegistryResult<Episode> {
        if old_id == new_id {
            return self.get_episode(old_id).await?.ok_or_else(|| RegistryError::NotFound(old_id.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let collision: Option<(String,)> = sqlx::query_as("SELECT episode_id FROM episodes WHERE episode_id = ?").bind(new_id).fetch_optional(&mut *tx).await?;
        if collision.is_some() {
            return Err(RegistryError::Conflict(format!("episode {new_id} already exists")));
        }

        let now = Utc::now().to_rfc3339();
        // The `clips.episode_id` FK is declared ON UPDATE CASCADE, so this
        // rename propagates to clips automatically; processing_log carries
        // no FK (it's an append-only audit trail) and needs the explicit
        // update.
        sqlx::query("UPDATE episodes SET episode_id = ?, updated_at = ? WHERE episode_id = ?")
            .bind(new_id)
            .bind(&now)
            .bind(old_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE processing_log SET episode_id = ? WHERE episode_id = ?").bind(new_id).bind(old_id).execute(&mut *tx).await?;

        let renamed: EpisodeRow = sqlx::query_as("SELECT * FROM episodes WHERE episode_id = ?").bind(new_id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        renamed.into_episode()
    }

    /// Cascades to clips, assets, and processing log rows. Does not touch
    /// on-disk files; that is ArtifactStore's job.
    pub async fn delete_episode(&self, id: &str) -> RegistryResult<()> {
        with_retry(&self.retry, "delete_episode", || async {
            let result = sqlx::query("DELETE FROM episodes WHERE episode_id = ?").bind(id).execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(RegistryError::NotFound(id.to_string()));
            }
            sqlx::query("DELETE FROM processing_log WHERE episode_id = ?").bind(id).execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    pub async fn append_log(&self, episode_id: &str, stage: Stage, event: LogEvent, duration_ms: Option<u64>, error: Option<&str>) -> RegistryResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO processing_log (episode_id, stage, event, duration_ms, error, recorded_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(episode_id)
        .bind(stage_str(stage))
        .bind(log_event_str(event))
        .bind(duration_ms.map(|d| d as i64))
        .bind(error)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_log(&self, episode_id: &str) -> RegistryResult<Vec<ProcessingLogEntry>> {
        let rows: Vec<LogRow> = sqlx::query_as("SELECT episode_id, stage, event, duration_ms, error, recorded_at FROM processing_log WHERE episode_id = ? ORDER BY id ASC")
            .bind(episode_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_entry()).collect()
    }

    pub async fn insert_clips(&self, episode_id: &str, candidates: Vec<ClipCandidate>) -> RegistryResult<Vec<Clip>> {
        let mut clips = Vec::with_capacity(candidates.len());
        let now = Utc::now();
        for candidate in candidates {
            let clip = Clip {
                clip_id: ClipId::new(),
                episode_id: episode_id.to_string(),
                start_ms: candidate.start_ms,
                end_ms: candidate.end_ms,
                score: candidate.score,
                status: pipeworks_models::ClipStatus::Discovered,
                metadata: candidate.metadata,
                created_at: now,
                updated_at: now,
            };
            let metadata = serde_json::to_string(&clip.metadata)?;
            sqlx::query(
                "INSERT INTO clips (clip_id, episode_id, start_ms, end_ms, score, status, metadata, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(clip.clip_id.to_string())
            .bind(&clip.episode_id)
            .bind(clip.start_ms as i64)
            .bind(clip.end_ms as i64)
            .bind(clip.score as f64)
            .bind(clip_status_str(clip.status))
            .bind(&metadata)
            .bind(clip.created_at.to_rfc3339())
            .bind(clip.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            clips.push(clip);
        }
        Ok(clips)
    }

    pub async fn list_clips(&self, episode_id: &str) -> RegistryResult<Vec<Clip>> {
        let rows: Vec<ClipRow> = sqlx::query_as("SELECT * FROM clips WHERE episode_id = ? ORDER BY start_ms ASC").bind(episode_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.into_clip()).collect()
    }

    pub async fn upsert_clip_asset(&self, asset: &ClipAsset) -> RegistryResult<()> {
        sqlx::query(
            "INSERT INTO clip_assets (clip_id, variant, aspect_ratio, output_path, file_size, status) VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(clip_id, variant, aspect_ratio) DO UPDATE SET output_path = excluded.output_path, \
             file_size = excluded.file_size, status = excluded.status",
        )
        .bind(asset.clip_id.to_string())
        .bind(variant_str(asset.variant))
        .bind(aspect_str(asset.aspect_ratio))
        .bind(&asset.output_path)
        .bind(asset.file_size.map(|v| v as i64))
        .bind(match asset.status {
            pipeworks_models::AssetStatus::Pending => "pending",
            pipeworks_models::AssetStatus::Ready => "ready",
            pipeworks_models::AssetStatus::Failed => "failed",
        })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_clip_assets(&self, clip_id: ClipId) -> RegistryResult<Vec<ClipAsset>> {
        let rows: Vec<ClipAssetRow> = sqlx::query_as("SELECT * FROM clip_assets WHERE clip_id = ?").bind(clip_id.to_string()).fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.into_asset()).collect()
    }

    /// Restores a clip's variant filter used by `SubmitRenderClipsJob` when
    /// the caller supplies an explicit `clip_ids` subset.
    pub async fn get_clip(&self, clip_id: ClipId) -> RegistryResult<Option<Clip>> {
        let row: Option<ClipRow> = sqlx::query_as("SELECT * FROM clips WHERE clip_id = ?").bind(clip_id.to_string()).fetch_optional(&self.pool).await?;
        row.map(|r| r.into_clip()).transpose()
    }

    pub fn variants_matrix(variants: &[ClipVariant], ratios: &[pipeworks_models::AspectRatio]) -> Vec<(ClipVariant, pipeworks_models::AspectRatio)> {
        variants.iter().flat_map(|v| ratios.iter().map(move |r| (*v, *r))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::EpisodeMetadata;

    async fn registry() -> Registry {
        let pool = crate::connection::connect_in_memory().await.unwrap();
        Registry::new(pool)
    }

    fn draft(id: &str, hash: &str, path: &str) -> EpisodeDraft {
        EpisodeDraft {
            episode_id: id.to_string(),
            content_hash: hash.to_string(),
            source_path: path.to_string(),
            file_size: 1024,
            duration_seconds: Some(600.0),
            last_modified: Utc::now(),
            metadata: EpisodeMetadata::default(),
        }
    }

    #[tokio::test]
    async fn register_episode_is_idempotent_on_hash() {
        let reg = registry().await;
        let first = reg.register_episode(draft("ep1", "hash-a", "/in/a.mp4")).await.unwrap();
        let second = reg.register_episode(draft("ep1-ignored", "hash-a", "/backup/a.mp4")).await.unwrap();

        assert_eq!(first.episode_id, second.episode_id);
        assert_eq!(second.source_path, "/backup/a.mp4");

        let all = reg.list_episodes(EpisodeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn update_episode_advances_stage_and_updated_at() {
        let reg = registry().await;
        let created = reg.register_episode(draft("ep1", "hash-b", "/in/b.mp4")).await.unwrap();

        let patch = EpisodePatch { stage: Some(Stage::Prepared), ..Default::default() };
        let updated = reg.update_episode(&created.episode_id, patch).await.unwrap();

        assert_eq!(updated.stage, Stage::Prepared);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn rename_episode_cascades_to_clips() {
        let reg = registry().await;
        let created = reg.register_episode(draft("old-id", "hash-c", "/in/c.mp4")).await.unwrap();
        reg.insert_clips(&created.episode_id, vec![ClipCandidate {
            start_ms: 0,
            end_ms: 1000,
            score: 0.5,
            metadata: Default::default(),
        }]).await.unwrap();

        let renamed = reg.rename_episode(&created.episode_id, "new-id").await.unwrap();
        assert_eq!(renamed.episode_id, "new-id");

        let clips = reg.list_clips("new-id").await.unwrap();
        assert_eq!(clips.len(), 1);
        assert!(reg.list_clips("old-id").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_episode_fails_on_collision() {
        let reg = registry().await;
        reg.register_episode(draft("a", "hash-d", "/in/d.mp4")).await.unwrap();
        reg.register_episode(draft("b", "hash-e", "/in/e.mp4")).await.unwrap();

        let result = reg.rename_episode("a", "b").await;
        assert!(matches!(result, Err(RegistryError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_episode_cascades_to_clips_and_log() {
        let reg = registry().await;
        let created = reg.register_episode(draft("ep-del", "hash-f", "/in/f.mp4")).await.unwrap();
        reg.insert_clips(&created.episode_id, vec![ClipCandidate { start_ms: 0, end_ms: 500, score: 0.1, metadata: Default::default() }]).await.unwrap();
        reg.append_log(&created.episode_id, Stage::Discovered, LogEvent::Completed, Some(10), None).await.unwrap();

        reg.delete_episode(&created.episode_id).await.unwrap();

        assert!(reg.get_episode(&created.episode_id).await.unwrap().is_none());
        assert!(reg.list_clips(&created.episode_id).await.unwrap().is_empty());
        assert!(reg.list_log(&created.episode_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_episode_is_not_found() {
        let reg = registry().await;
        let result = reg.delete_episode("nope").await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }
}
