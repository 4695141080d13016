use std::sync::Arc;

use pipeworks_artifacts::ArtifactStore;
use pipeworks_collab::{FfprobeProbe, HttpEnrichmentClient, HttpRenderClient, HttpSegmentationClient, HttpSttClient, StubEnricher, StubRenderer, StubSegmenter, StubSttClient};
use pipeworks_naming::{NamingService, PathResolver};
use pipeworks_pipeline::{CleanupManager, ClipDiscoveryJob, DedupIndex, DiscoveryScanner, PipelineOrchestrator, RenderClipsJob, StageRunner};
use pipeworks_queue::{JobQueue, PipelineJobRunner, QueueConfig, StuckDetector};
use pipeworks_registry::Registry;

use crate::config::ApiConfig;

/// Shared application state, assembled once at startup. Every handler
/// reaches the Registry, queue, and filesystem only through here.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Registry,
    pub artifacts: Arc<ArtifactStore>,
    pub naming: NamingService,
    pub resolver: PathResolver,
    pub queue: Arc<JobQueue>,
    pub discovery: Arc<DiscoveryScanner>,
    pub clip_discovery: Arc<ClipDiscoveryJob>,
    pub cleanup: Arc<CleanupManager>,
}

impl AppState {
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = pipeworks_registry::connect(&config.database_url).await?;
        let registry = Registry::new(pool);

        let artifacts = Arc::new(ArtifactStore::new(config.artifact_root.clone()));
        let naming = NamingService::default();
        let resolver = PathResolver::new(config.core.project_root.clone(), config.core.mount_aliases.clone());

        let stt: Arc<dyn pipeworks_collab::SpeechTranscriber> = match &config.collaborator_base_urls.stt {
            Some(url) => Arc::new(HttpSttClient::new(url.clone())),
            None => Arc::new(StubSttClient::default()),
        };
        let enricher: Arc<dyn pipeworks_collab::ContentEnricher> = match &config.collaborator_base_urls.enrichment {
            Some(url) => Arc::new(HttpEnrichmentClient::new(url.clone())),
            None => Arc::new(StubEnricher::default()),
        };
        let segmenter: Arc<dyn pipeworks_collab::ClipSegmenter> = match &config.collaborator_base_urls.segmentation {
            Some(url) => Arc::new(HttpSegmentationClient::new(url.clone())),
            None => Arc::new(StubSegmenter::default()),
        };
        let renderer: Arc<dyn pipeworks_collab::VideoRenderer> = match &config.collaborator_base_urls.renderer {
            Some(url) => Arc::new(HttpRenderClient::new(url.clone())),
            None => Arc::new(StubRenderer::default()),
        };
        let probe: Arc<dyn pipeworks_collab::MediaProbe> = Arc::new(FfprobeProbe);

        let executors: Vec<Arc<dyn pipeworks_pipeline::StageExecutor>> = vec![
            Arc::new(pipeworks_pipeline::PrepExecutor::new(probe)),
            Arc::new(pipeworks_pipeline::TranscriptionExecutor::new(stt, artifacts.clone())),
            Arc::new(pipeworks_pipeline::EnrichmentExecutor::new(enricher)),
            Arc::new(pipeworks_pipeline::RenderingExecutor::new(artifacts.clone())),
            Arc::new(pipeworks_pipeline::ClipDiscoveryExecutor::new(segmenter.clone())),
        ];

        let runner = StageRunner::new(executors, registry.clone(), artifacts.clone());
        let orchestrator = Arc::new(PipelineOrchestrator::new(registry.clone(), artifacts.clone(), runner, naming.clone(), config.core.stage_weights.clone()));

        let clip_discovery = Arc::new(ClipDiscoveryJob::new(segmenter, registry.clone()));
        let render_clips = Arc::new(RenderClipsJob::new(renderer, registry.clone(), artifacts.clone()));

        let job_runner = Arc::new(PipelineJobRunner::new(orchestrator, clip_discovery.clone(), render_clips));
        let queue = Arc::new(JobQueue::start(
            QueueConfig { max_workers: config.core.max_workers, queue_capacity: config.core.queue_capacity, webhook_retry_policy: config.core.webhook_retry_policy.clone() },
            job_runner,
        ));

        let discovery = Arc::new(DiscoveryScanner::new(registry.clone(), resolver.clone(), naming.clone(), config.discovery_source_dir.clone()));
        let cleanup = Arc::new(CleanupManager::new(registry.clone(), artifacts.clone()));

        Ok(Self { config, registry, artifacts, naming, resolver, queue, discovery, clip_discovery, cleanup })
    }
}
