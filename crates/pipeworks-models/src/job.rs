use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ProcessEpisode,
    RenderClips,
    DiscoverClips,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Invariant 5: a terminal status never transitions back to a
    /// non-terminal one.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Parameters for a `process_episode` job submission.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProcessEpisodeParams {
    pub episode_id: String,
    pub target_stage: crate::stage::Stage,
    #[serde(default)]
    pub force_reprocess: bool,
}

/// Parameters for a `render_clips` job submission.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RenderClipsParams {
    pub episode_id: String,
    pub clip_ids: Option<Vec<crate::clip::ClipId>>,
    pub variants: Vec<crate::clip::ClipVariant>,
    pub aspect_ratios: Vec<crate::clip::AspectRatio>,
    #[serde(default)]
    pub force: bool,
}

/// Parameters for a `discover_clips` job submission.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DiscoverClipsParams {
    pub episode_id: String,
    pub max_clips: u32,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub score_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum JobParams {
    ProcessEpisode(ProcessEpisodeParams),
    RenderClips(RenderClipsParams),
    DiscoverClips(DiscoverClipsParams),
}

impl JobParams {
    pub fn job_type(&self) -> JobType {
        match self {
            JobParams::ProcessEpisode(_) => JobType::ProcessEpisode,
            JobParams::RenderClips(_) => JobType::RenderClips,
            JobParams::DiscoverClips(_) => JobType::DiscoverClips,
        }
    }

    pub fn episode_id(&self) -> &str {
        match self {
            JobParams::ProcessEpisode(p) => &p.episode_id,
            JobParams::RenderClips(p) => &p.episode_id,
            JobParams::DiscoverClips(p) => &p.episode_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct JobResult {
    pub summary: serde_json::Value,
}

/// An in-process record of one queued/running/finished unit of work.
///
/// State transitions are exposed as consuming-and-returning methods rather
/// than raw field mutation, so every call site reads as the transition it
/// performs and invariants 5/6 (terminal-state and progress monotonicity)
/// are enforced in one place.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Job {
    pub job_id: JobId,
    pub params: JobParams,
    pub status: JobStatus,
    pub progress: u8,
    pub current_stage: Option<crate::stage::Stage>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_progress_at: DateTime<Utc>,
    pub eta_seconds: Option<f64>,
    pub webhook_url: Option<String>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub stuck: bool,
}

impl Job {
    pub fn new(params: JobParams, webhook_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            params,
            status: JobStatus::Queued,
            progress: 0,
            current_stage: None,
            message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            last_progress_at: now,
            eta_seconds: None,
            webhook_url,
            result: None,
            error: None,
            stuck: false,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.params.job_type()
    }

    pub fn episode_id(&self) -> &str {
        self.params.episode_id()
    }

    /// `queued` → `running`.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        self.last_progress_at = Utc::now();
        self
    }

    /// Apply a progress update, clamping any regression (invariant 6) and
    /// refreshing `last_progress_at`.
    pub fn with_progress(mut self, progress: u8, stage: Option<crate::stage::Stage>, message: Option<String>) -> Self {
        self.progress = progress.max(self.progress);
        if stage.is_some() {
            self.current_stage = stage;
        }
        if message.is_some() {
            self.message = message;
        }
        self.last_progress_at = Utc::now();
        self
    }

    /// `running` → `completed`.
    pub fn complete(mut self, result: JobResult) -> Self {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        self.last_progress_at = Utc::now();
        self
    }

    /// `running` → `failed`.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.last_progress_at = Utc::now();
        self
    }

    /// `queued` or `running` → `cancelled`.
    pub fn cancel(mut self) -> Self {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.last_progress_at = Utc::now();
        self
    }

    pub fn mark_stuck(mut self, stuck: bool) -> Self {
        self.stuck = stuck;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    fn sample_job() -> Job {
        Job::new(
            JobParams::ProcessEpisode(ProcessEpisodeParams {
                episode_id: "ep1".into(),
                target_stage: Stage::Rendered,
                force_reprocess: false,
            }),
            None,
        )
    }

    #[test]
    fn new_job_starts_queued_with_zero_progress() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn progress_never_regresses() {
        let job = sample_job().start().with_progress(40, None, None);
        let job = job.with_progress(10, None, None);
        assert_eq!(job.progress, 40);
    }

    #[test]
    fn terminal_states_are_recognized() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn complete_sets_progress_to_full() {
        let job = sample_job().start().complete(JobResult::default());
        assert_eq!(job.progress, 100);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
    }
}
