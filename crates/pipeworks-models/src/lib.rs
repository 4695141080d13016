//! Shared domain types for the pipeworks workspace: entities, stages, job
//! records, and the enumerated configuration record every other crate is
//! constructed from.

pub mod cancellation;
pub mod clip;
pub mod config;
pub mod episode;
pub mod error;
pub mod job;
pub mod processing_log;
pub mod progress;
pub mod stage;

pub use cancellation::CancellationToken;
pub use clip::{AspectRatio, AssetStatus, Clip, ClipAsset, ClipCandidate, ClipId, ClipMetadata, ClipStatus, ClipVariant};
pub use config::{DbKind, MountAliases, PipeworksCoreConfig, StageTimeouts, StageWeights, WebhookRetryPolicy};
pub use episode::{Enrichment, Episode, EpisodeDraft, EpisodeFilter, EpisodeMetadata, EpisodePatch, ScoredPerson, Transcription, WordTiming};
pub use error::CoreError;
pub use job::{DiscoverClipsParams, Job, JobId, JobParams, JobResult, JobStatus, JobType, ProcessEpisodeParams, RenderClipsParams};
pub use processing_log::{LogEvent, ProcessingLogEntry};
pub use progress::{noop_progress, ProgressCallback};
pub use stage::Stage;
