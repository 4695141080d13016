//! The in-process job queue (C7), job table (C8's sibling for in-flight
//! state), stuck-job detector (C9), and webhook dispatcher the HTTP surface
//! and worker pool are built on.

pub mod error;
pub mod metrics;
pub mod pool;
pub mod runner;
pub mod state;
pub mod stuck;
pub mod webhook;

pub use error::{QueueError, QueueResult};
pub use pool::{JobQueue, QueueConfig, QueueStats};
pub use runner::{JobExecutionOutcome, JobRunner, PipelineJobRunner};
pub use state::JobTable;
pub use stuck::StuckDetector;
pub use webhook::WebhookDispatcher;
