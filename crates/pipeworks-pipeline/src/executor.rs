use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pipeworks_artifacts::{ArtifactPaths, ArtifactStore};
use pipeworks_collab::{ContentEnricher, EnrichmentContext, MediaProbe, SpeechTranscriber};
use pipeworks_models::{CancellationToken, Enrichment, Episode, EpisodeMetadata, EpisodePatch, ProgressCallback, Stage, Transcription};

use crate::outcome::StageOutcome;

/// One executable unit of work for a single stage, dispatched by
/// `StageRunner` (§4.5). Implementations own the collaborator call, the
/// artifact write, and the `EpisodePatch` that records the result; they
/// never touch the registry directly so the runner can apply every patch
/// through one retrying code path.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    fn stage(&self) -> Stage;

    async fn run(
        &self,
        episode: &Episode,
        paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>);
}

/// Probes the source file and records its duration. Prep has no dedicated
/// collaborator trait of its own beyond `MediaProbe`, which the prep
/// executor and nothing else calls.
pub struct PrepExecutor {
    probe: Arc<dyn MediaProbe>,
}

impl PrepExecutor {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl StageExecutor for PrepExecutor {
    fn stage(&self) -> Stage {
        Stage::Prepared
    }

    async fn run(
        &self,
        episode: &Episode,
        _paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>) {
        if cancel.is_cancelled() {
            return (StageOutcome::Cancelled, None);
        }
        match self.probe.probe(Path::new(&episode.source_path)).await {
            Ok(info) => {
                progress(100, Some("media probed".into()));
                let patch = EpisodePatch { duration_seconds: Some(info.duration_seconds), stage: Some(Stage::Prepared), ..Default::default() };
                (StageOutcome::Completed, Some(patch))
            }
            Err(e) => (StageOutcome::Failed(e.to_string()), None),
        }
    }
}

pub struct TranscriptionExecutor {
    transcriber: Arc<dyn SpeechTranscriber>,
    artifacts: Arc<ArtifactStore>,
}

impl TranscriptionExecutor {
    pub fn new(transcriber: Arc<dyn SpeechTranscriber>, artifacts: Arc<ArtifactStore>) -> Self {
        Self { transcriber, artifacts }
    }
}

#[async_trait]
impl StageExecutor for TranscriptionExecutor {
    fn stage(&self) -> Stage {
        Stage::Transcribed
    }

    async fn run(
        &self,
        episode: &Episode,
        paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>) {
        let language = episode.metadata.language.clone();
        let transcript = match self.transcriber.transcribe(Path::new(&episode.source_path), language.as_deref(), progress, cancel).await {
            Ok(t) => t,
            Err(pipeworks_collab::CollabError::Cancelled) => return (StageOutcome::Cancelled, None),
            Err(e) => return (StageOutcome::Failed(e.to_string()), None),
        };

        if let Err(e) = write_transcript_artifacts(&self.artifacts, paths, &transcript).await {
            return (StageOutcome::Failed(e.to_string()), None);
        }

        let patch = EpisodePatch { stage: Some(Stage::Transcribed), transcription: Some(transcript), ..Default::default() };
        (StageOutcome::Completed, Some(patch))
    }
}

async fn write_transcript_artifacts(store: &ArtifactStore, paths: &ArtifactPaths, transcript: &Transcription) -> std::io::Result<()> {
    store.write_bytes(&paths.transcript_txt, transcript.text.as_bytes(), true).await.map_err(into_io_error)?;
    let json = serde_json::to_vec_pretty(transcript).unwrap_or_default();
    store.write_bytes(&paths.transcript_json, &json, true).await.map_err(into_io_error)?;
    let vtt = render_vtt(transcript);
    store.write_bytes(&paths.transcript_vtt, vtt.as_bytes(), true).await.map_err(into_io_error)?;
    Ok(())
}

fn into_io_error(e: pipeworks_artifacts::ArtifactError) -> std::io::Error {
    match e {
        pipeworks_artifacts::ArtifactError::Io(inner) => inner,
    }
}

fn render_vtt(transcript: &Transcription) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for (i, word) in transcript.words.iter().enumerate() {
        out.push_str(&format!("{}\n{} --> {}\n{}\n\n", i + 1, format_vtt_time(word.start), format_vtt_time(word.end), word.token));
    }
    out
}

fn format_vtt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

pub struct EnrichmentExecutor {
    enricher: Arc<dyn ContentEnricher>,
}

impl EnrichmentExecutor {
    pub fn new(enricher: Arc<dyn ContentEnricher>) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl StageExecutor for EnrichmentExecutor {
    fn stage(&self) -> Stage {
        Stage::Enriched
    }

    async fn run(
        &self,
        episode: &Episode,
        _paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>) {
        let Some(transcript) = &episode.transcription else {
            return (StageOutcome::Failed("enrichment requires a prior transcription".into()), None);
        };
        let context = EnrichmentContext { known_metadata: episode.metadata.clone() };
        let enrichment = match self.enricher.enrich(&transcript.text, Some(&context), progress, cancel).await {
            Ok(e) => e,
            Err(pipeworks_collab::CollabError::Cancelled) => return (StageOutcome::Cancelled, None),
            Err(e) => return (StageOutcome::Failed(e.to_string()), None),
        };

        let metadata = apply_enrichment_to_metadata(&episode.metadata, &enrichment);
        let patch = EpisodePatch { stage: Some(Stage::Enriched), enrichment: Some(enrichment), metadata: Some(metadata), ..Default::default() };
        (StageOutcome::Completed, Some(patch))
    }
}

/// Fills any metadata fields the discovery pass left empty with what
/// enrichment learned, without overwriting values already known.
fn apply_enrichment_to_metadata(current: &EpisodeMetadata, enrichment: &Enrichment) -> EpisodeMetadata {
    let mut metadata = current.clone();
    if metadata.host_name.is_none() {
        metadata.host_name = enrichment.people.iter().max_by(|a, b| a.score.total_cmp(&b.score)).map(|p| p.name.clone());
    }
    if metadata.show_name.is_none() {
        metadata.show_name = enrichment.show_name.clone();
    }
    if metadata.episode_number.is_none() {
        metadata.episode_number = enrichment.episode_number;
    }
    if metadata.air_date.is_none() {
        metadata.air_date = enrichment.air_date;
    }
    metadata
}

pub struct RenderingExecutor {
    artifacts: Arc<ArtifactStore>,
}

impl RenderingExecutor {
    pub fn new(artifacts: Arc<ArtifactStore>) -> Self {
        Self { artifacts }
    }
}

#[async_trait]
impl StageExecutor for RenderingExecutor {
    fn stage(&self) -> Stage {
        Stage::Rendered
    }

    async fn run(
        &self,
        episode: &Episode,
        paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>) {
        if cancel.is_cancelled() {
            return (StageOutcome::Cancelled, None);
        }
        let html = render_episode_page(episode);
        let index = paths.html_dir.join("index.html");
        if let Err(e) = self.artifacts.write_bytes(&index, html.as_bytes(), true).await {
            return (StageOutcome::Failed(e.to_string()), None);
        }
        progress(100, Some("page rendered".into()));
        let patch = EpisodePatch { stage: Some(Stage::Rendered), ..Default::default() };
        (StageOutcome::Completed, Some(patch))
    }
}

/// A minimal, dependency-free HTML summary page. Not a templating engine:
/// the collaborator interfaces have no "renderer" trait for this, so it is
/// built inline the way a small ambient feature would be.
fn render_episode_page(episode: &Episode) -> String {
    let title = episode.metadata.title.clone().unwrap_or_else(|| episode.episode_id.clone());
    let summary = episode.enrichment.as_ref().map(|e| e.summary.as_str()).unwrap_or_default();
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1><p>{summary}</p></body></html>"
    )
}

pub struct ClipDiscoveryExecutor {
    segmenter: Arc<dyn pipeworks_collab::ClipSegmenter>,
}

impl ClipDiscoveryExecutor {
    pub fn new(segmenter: Arc<dyn pipeworks_collab::ClipSegmenter>) -> Self {
        Self { segmenter }
    }

    pub async fn discover(
        &self,
        transcript: &Transcription,
        config: &pipeworks_collab::ClipDiscoveryConfig,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> Result<Vec<pipeworks_models::ClipCandidate>, pipeworks_collab::CollabError> {
        self.segmenter.discover_clips(transcript, config, progress, cancel).await
    }
}

#[async_trait]
impl StageExecutor for ClipDiscoveryExecutor {
    fn stage(&self) -> Stage {
        Stage::ClipsDiscovered
    }

    async fn run(
        &self,
        episode: &Episode,
        _paths: &ArtifactPaths,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> (StageOutcome, Option<EpisodePatch>) {
        let Some(transcript) = &episode.transcription else {
            return (StageOutcome::Failed("clip discovery requires a prior transcription".into()), None);
        };
        let config = pipeworks_collab::ClipDiscoveryConfig { max_clips: 10, min_duration_ms: 15_000, max_duration_ms: 90_000, score_threshold: 0.0 };
        match self.discover(transcript, &config, progress, cancel).await {
            Ok(_candidates) => {
                let patch = EpisodePatch { stage: Some(Stage::ClipsDiscovered), ..Default::default() };
                (StageOutcome::Completed, Some(patch))
            }
            Err(pipeworks_collab::CollabError::Cancelled) => (StageOutcome::Cancelled, None),
            Err(e) => (StageOutcome::Failed(e.to_string()), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_collab::{StubEnricher, StubMediaProbe, StubSttClient};
    use pipeworks_models::{noop_progress, EpisodeMetadata};
    use tempfile::TempDir;

    fn sample_episode() -> Episode {
        Episode {
            episode_id: "show_ep1_2024-01-01".into(),
            content_hash: "h".into(),
            source_path: "in.mp4".into(),
            file_size: 1,
            duration_seconds: None,
            last_modified: chrono::Utc::now(),
            stage: Stage::Discovered,
            metadata: EpisodeMetadata::default(),
            transcription: None,
            enrichment: None,
            error: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn prep_executor_populates_duration() {
        let executor = PrepExecutor::new(Arc::new(StubMediaProbe { duration_seconds: 120.0 }));
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_string_lossy().to_string());
        let episode = sample_episode();
        let paths = store.paths_for(&episode);

        let (outcome, patch) = executor.run(&episode, &paths, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, StageOutcome::Completed));
        assert_eq!(patch.unwrap().duration_seconds, Some(120.0));
    }

    #[tokio::test]
    async fn transcription_executor_writes_artifacts_and_patches_transcript() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ArtifactStore::new(dir.path().to_string_lossy().to_string()));
        let executor = TranscriptionExecutor::new(Arc::new(StubSttClient::default()), store.clone());
        let episode = sample_episode();
        let paths = store.paths_for(&episode);

        let (outcome, patch) = executor.run(&episode, &paths, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, StageOutcome::Completed));
        assert!(patch.unwrap().transcription.is_some());
        assert!(tokio::fs::metadata(&paths.transcript_txt).await.is_ok());
        assert!(tokio::fs::metadata(&paths.transcript_vtt).await.is_ok());
    }

    #[tokio::test]
    async fn enrichment_executor_requires_prior_transcript() {
        let executor = EnrichmentExecutor::new(Arc::new(StubEnricher));
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().to_string_lossy().to_string());
        let episode = sample_episode();
        let paths = store.paths_for(&episode);

        let (outcome, _) = executor.run(&episode, &paths, noop_progress(), CancellationToken::new()).await;
        assert!(matches!(outcome, StageOutcome::Failed(_)));
    }
}
