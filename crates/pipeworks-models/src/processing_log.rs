use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    Started,
    Completed,
    Skipped,
    Failed,
}

/// One append-only audit row for a per-stage event on an episode.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProcessingLogEntry {
    pub episode_id: String,
    pub stage: Stage,
    pub event: LogEvent,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
