use chrono::{DateTime, Utc};
use pipeworks_models::{AspectRatio, Clip, ClipAsset, ClipId, ClipMetadata, ClipStatus, ClipVariant, Enrichment, Episode, EpisodeMetadata, AssetStatus, LogEvent, ProcessingLogEntry, Stage, Transcription};

use crate::error::{RegistryError, RegistryResult};

#[derive(sqlx::FromRow)]
pub struct EpisodeRow {
    pub episode_id: String,
    pub content_hash: String,
    pub source_path: String,
    pub file_size: i64,
    pub duration_seconds: Option<f64>,
    pub last_modified: String,
    pub stage: String,
    pub metadata: String,
    pub transcription: Option<String>,
    pub enrichment: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn parse_ts(s: &str) -> RegistryResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s).map_err(|e| RegistryError::Validation(e.to_string()))?.with_timezone(&Utc))
}

impl EpisodeRow {
    pub fn into_episode(self) -> RegistryResult<Episode> {
        Ok(Episode {
            episode_id: self.episode_id,
            content_hash: self.content_hash,
            source_path: self.source_path,
            file_size: self.file_size as u64,
            duration_seconds: self.duration_seconds,
            last_modified: parse_ts(&self.last_modified)?,
            stage: self.stage.parse().map_err(RegistryError::Validation)?,
            metadata: serde_json::from_str::<EpisodeMetadata>(&self.metadata)?,
            transcription: self.transcription.map(|t| serde_json::from_str::<Transcription>(&t)).transpose()?,
            enrichment: self.enrichment.map(|e| serde_json::from_str::<Enrichment>(&e)).transpose()?,
            error: self.error,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub fn stage_str(stage: Stage) -> String {
    stage.to_string()
}

#[derive(sqlx::FromRow)]
pub struct ClipRow {
    pub clip_id: String,
    pub episode_id: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub score: f64,
    pub status: String,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ClipRow {
    pub fn into_clip(self) -> RegistryResult<Clip> {
        Ok(Clip {
            clip_id: ClipId(uuid::Uuid::parse_str(&self.clip_id).map_err(|e| RegistryError::Validation(e.to_string()))?),
            episode_id: self.episode_id,
            start_ms: self.start_ms as u64,
            end_ms: self.end_ms as u64,
            score: self.score as f32,
            status: parse_clip_status(&self.status)?,
            metadata: serde_json::from_str::<ClipMetadata>(&self.metadata)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub fn clip_status_str(status: ClipStatus) -> &'static str {
    match status {
        ClipStatus::Discovered => "discovered",
        ClipStatus::Rendering => "rendering",
        ClipStatus::Ready => "ready",
        ClipStatus::Failed => "failed",
    }
}

fn parse_clip_status(s: &str) -> RegistryResult<ClipStatus> {
    match s {
        "discovered" => Ok(ClipStatus::Discovered),
        "rendering" => Ok(ClipStatus::Rendering),
        "ready" => Ok(ClipStatus::Ready),
        "failed" => Ok(ClipStatus::Failed),
        other => Err(RegistryError::Validation(format!("unknown clip status: {other}"))),
    }
}

#[derive(sqlx::FromRow)]
pub struct ClipAssetRow {
    pub clip_id: String,
    pub variant: String,
    pub aspect_ratio: String,
    pub output_path: String,
    pub file_size: Option<i64>,
    pub status: String,
}

impl ClipAssetRow {
    pub fn into_asset(self) -> RegistryResult<ClipAsset> {
        Ok(ClipAsset {
            clip_id: ClipId(uuid::Uuid::parse_str(&self.clip_id).map_err(|e| RegistryError::Validation(e.to_string()))?),
            variant: parse_variant(&self.variant)?,
            aspect_ratio: parse_aspect(&self.aspect_ratio)?,
            output_path: self.output_path,
            file_size: self.file_size.map(|v| v as u64),
            status: match self.status.as_str() {
                "pending" => AssetStatus::Pending,
                "ready" => AssetStatus::Ready,
                "failed" => AssetStatus::Failed,
                other => return Err(RegistryError::Validation(format!("unknown asset status: {other}"))),
            },
        })
    }
}

pub fn variant_str(v: ClipVariant) -> &'static str {
    match v {
        ClipVariant::Clean => "clean",
        ClipVariant::Subtitled => "subtitled",
        ClipVariant::Branded => "branded",
    }
}

fn parse_variant(s: &str) -> RegistryResult<ClipVariant> {
    match s {
        "clean" => Ok(ClipVariant::Clean),
        "subtitled" => Ok(ClipVariant::Subtitled),
        "branded" => Ok(ClipVariant::Branded),
        other => Err(RegistryError::Validation(format!("unknown variant: {other}"))),
    }
}

pub fn aspect_str(a: AspectRatio) -> &'static str {
    match a {
        AspectRatio::Widescreen => "16:9",
        AspectRatio::Vertical => "9:16",
        AspectRatio::Square => "1:1",
    }
}

fn parse_aspect(s: &str) -> RegistryResult<AspectRatio> {
    match s {
        "16:9" => Ok(AspectRatio::Widescreen),
        "9:16" => Ok(AspectRatio::Vertical),
        "1:1" => Ok(AspectRatio::Square),
        other => Err(RegistryError::Validation(format!("unknown aspect ratio: {other}"))),
    }
}

pub fn log_event_str(e: LogEvent) -> &'static str {
    match e {
        LogEvent::Started => "started",
        LogEvent::Completed => "completed",
        LogEvent::Skipped => "skipped",
        LogEvent::Failed => "failed",
    }
}

#[derive(sqlx::FromRow)]
pub struct LogRow {
    pub episode_id: String,
    pub stage: String,
    pub event: String,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
    pub recorded_at: String,
}

impl LogRow {
    pub fn into_entry(self) -> RegistryResult<ProcessingLogEntry> {
        Ok(ProcessingLogEntry {
            episode_id: self.episode_id,
            stage: self.stage.parse().map_err(RegistryError::Validation)?,
            event: match self.event.as_str() {
                "started" => LogEvent::Started,
                "completed" => LogEvent::Completed,
                "skipped" => LogEvent::Skipped,
                "failed" => LogEvent::Failed,
                other => return Err(RegistryError::Validation(format!("unknown log event: {other}"))),
            },
            duration_ms: self.duration_ms.map(|v| v as u64),
            error: self.error,
            recorded_at: parse_ts(&self.recorded_at)?,
        })
    }
}
