use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use pipeworks_models::{
    AspectRatio, CancellationToken, ClipCandidate, Enrichment, ProgressCallback, Transcription,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{CollabError, CollabResult};
use crate::traits::{ClipDiscoveryConfig, ClipSegmenter, ContentEnricher, EnrichmentContext, MediaInfo, MediaProbe, SpeechTranscriber, VideoRenderer};

fn http_client() -> Client {
    Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client")
}

/// Calls a configured sidecar process over HTTP for the actual STT engine.
/// Not exercised by the default test suite; `StubSttClient` stands in for
/// it there.
#[derive(Debug, Clone)]
pub struct HttpSttClient {
    base_url: String,
    client: Client,
}

impl HttpSttClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: http_client() }
    }
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    audio_path: &'a str,
    language: Option<&'a str>,
}

#[async_trait]
impl SpeechTranscriber for HttpSttClient {
    async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Transcription> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        let body = TranscribeRequest { audio_path: &audio_path.to_string_lossy(), language };
        let response = self.client.post(format!("{}/transcribe", self.base_url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Failure(format!("stt sidecar returned {}", response.status())));
        }
        progress(100, Some("transcription received".into()));
        Ok(response.json::<Transcription>().await?)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEnrichmentClient {
    base_url: String,
    client: Client,
}

impl HttpEnrichmentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: http_client() }
    }
}

#[derive(Serialize)]
struct EnrichRequest<'a> {
    text: &'a str,
    context: Option<&'a EnrichmentContext>,
}

#[async_trait]
impl ContentEnricher for HttpEnrichmentClient {
    async fn enrich(
        &self,
        text: &str,
        context: Option<&EnrichmentContext>,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Enrichment> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        let body = EnrichRequest { text, context };
        let response = self.client.post(format!("{}/enrich", self.base_url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Failure(format!("enrichment sidecar returned {}", response.status())));
        }
        progress(100, Some("enrichment received".into()));
        Ok(response.json::<Enrichment>().await?)
    }
}

#[derive(Debug, Clone)]
pub struct HttpSegmentationClient {
    base_url: String,
    client: Client,
}

impl HttpSegmentationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: http_client() }
    }
}

#[derive(Serialize)]
struct SegmentRequest<'a> {
    transcript: &'a Transcription,
    config: &'a ClipDiscoveryConfig,
}

#[derive(Deserialize)]
struct SegmentResponse {
    candidates: Vec<ClipCandidate>,
}

#[async_trait]
impl ClipSegmenter for HttpSegmentationClient {
    async fn discover_clips(
        &self,
        transcript: &Transcription,
        config: &ClipDiscoveryConfig,
        progress: ProgressCallback,
        cancel: CancellationToken,
    ) -> CollabResult<Vec<ClipCandidate>> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        let body = SegmentRequest { transcript, config };
        let response = self.client.post(format!("{}/segment", self.base_url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Failure(format!("segmentation sidecar returned {}", response.status())));
        }
        progress(100, Some("segmentation received".into()));
        Ok(response.json::<SegmentResponse>().await?.candidates)
    }
}

#[derive(Debug, Clone)]
pub struct HttpRenderClient {
    base_url: String,
    client: Client,
}

impl HttpRenderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: http_client() }
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    source: &'a str,
    start_ms: u64,
    end_ms: u64,
    variant: pipeworks_models::ClipVariant,
    aspect_ratio: AspectRatio,
    out_path: &'a str,
}

#[async_trait]
impl VideoRenderer for HttpRenderClient {
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
    ) -> CollabResult<()> {
        if cancel.is_cancelled() {
            return Err(CollabError::Cancelled);
        }
        let body = RenderRequest {
            source: &source.to_string_lossy(),
            start_ms,
            end_ms,
            variant,
            aspect_ratio,
            out_path: &out_path.to_string_lossy(),
        };
        let response = self.client.post(format!("{}/render", self.base_url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Failure(format!("render sidecar returned {}", response.status())));
        }
        progress(100, Some("render complete".into()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpMediaProbeClient {
    base_url: String,
    client: Client,
}

impl HttpMediaProbeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: http_client() }
    }
}

#[async_trait]
impl MediaProbe for HttpMediaProbeClient {
    async fn probe(&self, path: &Path) -> CollabResult<MediaInfo> {
        let response = self.client.get(format!("{}/probe", self.base_url)).query(&[("path", path.to_string_lossy())]).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Failure(format!("probe sidecar returned {}", response.status())));
        }
        Ok(response.json::<MediaInfo>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_models::noop_progress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn http_stt_client_parses_sidecar_response() {
        let server = MockServer::start().await;
        let transcript = Transcription { text: "hello".into(), words: vec![], language: Some("en".into()), confidence: Some(0.9) };
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&transcript))
            .mount(&server)
            .await;

        let client = HttpSttClient::new(server.uri());
        let result = client
            .transcribe(Path::new("in.wav"), Some("en"), noop_progress(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.text, "hello");
    }

    #[tokio::test]
    async fn http_stt_client_surfaces_non_success_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/transcribe")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

        let client = HttpSttClient::new(server.uri());
        let result = client.transcribe(Path::new("in.wav"), None, noop_progress(), CancellationToken::new()).await;

        assert!(matches!(result, Err(CollabError::Failure(_))));
    }
}
