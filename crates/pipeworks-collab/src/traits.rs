use std::path::Path;

use async_trait::async_trait;
use pipeworks_models::{
    AspectRatio, CancellationToken, Enrichment, EpisodeMetadata, ProgressCallback, Transcription,
};
use serde::{Deserialize, Serialize};

use crate::error::CollabResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentContext {
    pub known_metadata: EpisodeMetadata,
}

/// The narrow interface through which the core consumes an external
/// speech-to-text engine. Implementations MUST be callable concurrently
/// from different worker tasks and MUST honor `cancel`.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Transcription>;
}

/// The narrow interface for LLM-driven enrichment.
#[async_trait]
pub trait ContentEnricher: Send + Sync {
    async fn enrich(
        &self,
        text: &str,
        context: Option<&EnrichmentContext>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Enrichment>;
}

/// The narrow interface for embedding-based clip segmentation.
#[async_trait]
pub trait ClipSegmenter: Send + Sync {
    async fn discover_clips(
        &self,
        transcript: &Transcription,
        config: &ClipDiscoveryConfig,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Vec<pipeworks_models::ClipCandidate>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDiscoveryConfig {
    pub max_clips: u32,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub score_threshold: f32,
}

/// The narrow interface for the external, ffmpeg-like video encoder.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn render(
        &self,
        source: &Path,
        start_ms: u64,
        end_ms: u64,
        variant: pipeworks_models::ClipVariant,
        aspect_ratio: AspectRatio,
        out_path: &Path,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub codec: Option<String>,
    pub file_size: u64,
    pub bitrate: Option<u64>,
}

/// The ffprobe-like interface consumed by the prep stage.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> CollabResult<MediaInfo>;
}
