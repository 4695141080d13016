use std::sync::Arc;

use async_trait::async_trait;
use pipeworks_models::{CancellationToken, JobParams, JobResult, ProgressCallback};
use pipeworks_pipeline::{ClipDiscoveryJob, OrchestratorOutcome, PipelineOrchestrator, RenderClipsJob};

/// The tagged result of running one job's parameters to completion,
/// distinct from `StageOutcome` because a job spans many stages.
pub enum JobExecutionOutcome {
    Completed(JobResult),
    Failed(String),
    Cancelled,
}

/// Executes one job's parameters to completion. The only implementation is
/// `PipelineJobRunner`; the trait exists so `WorkerPool` does not need to
/// know about the three concrete job bodies.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn execute(&self, params: &JobParams, progress: ProgressCallback, cancel: CancellationToken) -> JobExecutionOutcome;
}

/// Dispatches a job's parameters to the matching pipeline component:
/// `process_episode` through the orchestrator, `render_clips` and
/// `discover_clips` through their dedicated job bodies.
pub struct PipelineJobRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    clip_discovery: Arc<ClipDiscoveryJob>,
    render_clips: Arc<RenderClipsJob>,
}

impl PipelineJobRunner {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, clip_discovery: Arc<ClipDiscoveryJob>, render_clips: Arc<RenderClipsJob>) -> Self {
        Self { orchestrator, clip_discovery, render_clips }
    }
}

#[async_trait]
impl JobRunner for PipelineJobRunner {
    async fn execute(&self, params: &JobParams, progress: ProgressCallback, cancel: CancellationToken) -> JobExecutionOutcome {
        match params {
            JobParams::ProcessEpisode(p) => {
                let outcome = self.orchestrator.run(&p.episode_id, p.target_stage, p.force_reprocess, progress, cancel).await;
                match outcome {
                    OrchestratorOutcome::Completed(episode) => {
                        JobExecutionOutcome::Completed(JobResult { summary: serde_json::json!({"episode_id": episode.episode_id, "stage": episode.stage}) })
                    }
                    OrchestratorOutcome::Failed(message, _) => JobExecutionOutcome::Failed(message),
                    OrchestratorOutcome::Cancelled(_) => JobExecutionOutcome::Cancelled,
                }
            }
            JobParams::RenderClips(p) => {
                let result = self.render_clips.run(p, progress, cancel.clone()).await;
                if cancel.is_cancelled() {
                    return JobExecutionOutcome::Cancelled;
                }
                match result {
                    Ok(rendered) => JobExecutionOutcome::Completed(JobResult { summary: serde_json::json!({"rendered": rendered}) }),
                    Err(e) => JobExecutionOutcome::Failed(e),
                }
            }
            JobParams::DiscoverClips(p) => {
                let result = self.clip_discovery.run(p, progress, cancel.clone()).await;
                if cancel.is_cancelled() {
                    return JobExecutionOutcome::Cancelled;
                }
                match result {
                    Ok(count) => JobExecutionOutcome::Completed(JobResult { summary: serde_json::json!({"clips_found": count}) }),
                    Err(e) => JobExecutionOutcome::Failed(e),
                }
            }
        }
    }
}
