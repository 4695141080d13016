use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use pipeworks_models::{
    AspectRatio, CancellationToken, ClipCandidate, ClipMetadata, Enrichment, ProgressCallback, ScoredPerson,
    Transcription, WordTiming,
};

use crate::error::{CollabError, CollabResult};
use crate::traits::{ClipDiscoveryConfig, ClipSegmenter, ContentEnricher, EnrichmentContext, MediaInfo, MediaProbe, SpeechTranscriber, VideoRenderer};

/// Deterministic STT double for tests: returns fixed text after reporting
/// a small number of progress callbacks, or fails on the Nth callback when
/// `fail_on_callback` is set (used to exercise S3's mid-transcription
/// failure scenario).
#[derive(Debug, Clone)]
pub struct StubSttClient {
    pub text: String,
    pub fail_on_callback: Option<u32>,
}

impl Default for StubSttClient {
    fn default() -> Self {
        Self { text: "this is a stub transcript".into(), fail_on_callback: None }
    }
}

#[async_trait]
impl SpeechTranscriber for StubSttClient {
    async fn transcribe(
        &self,
        _audio_path: &Path,
        language: Option<&str>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Transcription> {
        let calls = AtomicU32::new(0);
        for pct in [20, 50, 80, 100] {
            if cancel.is_cancelled() {
                return Err(CollabError::Cancelled);
            }
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_callback == Some(n) {
                return Err(CollabError::Failure(format!("stub STT failure on callback {n}")));
            }
            progress(pct, Some(format!("transcribing {pct}%")));
        }

        Ok(Transcription {
            text: self.text.clone(),
            words: vec![WordTiming { start: 0.0, end: 1.0, token: "this".into() }],
            language: language.map(str::to_string),
            confidence: Some(0.95),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StubEnricher;

#[async_trait]
impl ContentEnricher for StubEnricher {
    async fn enrich(
        &self,
        _text: &str,
        context: Option<&EnrichmentContext>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Enrichment> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        progress(100, Some("enrichment complete".into()));

        let known = context.map(|c| &c.known_metadata);
        let show_name = known.and_then(|m| m.show_name.clone()).or_else(|| Some("Stub Show".to_string()));
        let episode_number = known.and_then(|m| m.episode_number).or(Some(1));
        let air_date = known.and_then(|m| m.air_date).or_else(|| chrono::NaiveDate::from_ymd_opt(2024, 1, 1));

        Ok(Enrichment {
            summary: "A stub executive summary.".into(),
            takeaways: vec!["stub takeaway".into()],
            topics: vec!["stub topic".into()],
            tags: vec!["stub".into()],
            people: vec![ScoredPerson { name: "Stub Host".into(), score: 0.9 }],
            show_name,
            episode_number,
            air_date,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StubSegmenter;

#[async_trait]
impl ClipSegmenter for StubSegmenter {
    async fn discover_clips(
        &self,
        _transcript: &Transcription,
        config: &ClipDiscoveryConfig,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Vec<ClipCandidate>> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        progress(100, Some("segmentation complete".into()));
        let mut candidates = Vec::new();
        let mut start = 0u64;
        for i in 0..config.max_clips.min(3) {
            let end = start + config.min_duration_ms.max(1000);
            candidates.push(ClipCandidate {
                start_ms: start,
                end_ms: end,
                score: 0.5 + 0.1 * i as f32,
                metadata: ClipMetadata { title: Some(format!("Stub clip {i}")), ..Default::default() },
            });
            start = end;
        }
        Ok(candidates)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StubRenderer;

#[async_trait]
impl VideoRenderer for StubRenderer {
    async fn render(
        &self,
        _source: &Path,
        _start_ms: u64,
        _end_ms: u64,
        _variant: pipeworks_models::ClipVariant,
        _aspect_ratio: AspectRatio,
        out_path: &Path,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<()> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| CollabError::Failure(e.to_string()))?;
        }
        tokio::fs::write(out_path, b"stub-rendered-clip").await.map_err(|e| CollabError::Failure(e.to_string()))?;
        progress(100, Some("render complete".into()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StubMediaProbe {
    pub duration_seconds: f64,
}

#[async_trait]
impl MediaProbe for StubMediaProbe {
    async fn probe(&self, _path: &Path) -> CollabResult<MediaInfo> {
        Ok(MediaInfo {
            duration_seconds: self.duration_seconds,
            width: Some(1920),
            height: Some(1080),
            fps: Some(30.0),
            codec: Some("h264".into()),
            file_size: 1024,
            bitrate: Some(4_000_000),
        })
    }
}
