use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Relative contribution of each stage to a job's overall progress (§4.6).
/// Stages skipped contribute their full weight immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StageWeights {
    pub transcription: f64,
    pub enrichment: f64,
    pub rendering: f64,
    pub clip_discovery: f64,
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            transcription: 0.55,
            enrichment: 0.30,
            rendering: 0.05,
            clip_discovery: 0.10,
        }
    }
}

impl StageWeights {
    pub fn weight_for(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Transcribed => self.transcription,
            Stage::Enriched => self.enrichment,
            Stage::Rendered => self.rendering,
            Stage::ClipsDiscovered => self.clip_discovery,
            Stage::Discovered | Stage::Prepared => 0.0,
        }
    }
}

/// Soft per-stage timeouts that drive `StuckDetector`, never a kill switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StageTimeouts {
    pub transcription: Duration,
    pub enrichment: Duration,
    pub clip_render_per_clip: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            transcription: Duration::from_secs(20 * 60),
            enrichment: Duration::from_secs(10 * 60),
            clip_render_per_clip: Duration::from_secs(15 * 60),
        }
    }
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Transcribed => self.transcription,
            Stage::Enriched => self.enrichment,
            Stage::ClipsDiscovered => self.clip_render_per_clip,
            _ => Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WebhookRetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
    pub max_body_bytes: usize,
}

impl Default for WebhookRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![Duration::from_secs(1), Duration::from_secs(4), Duration::from_secs(16)],
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DbKind {
    /// Single embedded file; the owning process must be the sole writer.
    Embedded,
    /// Network-reachable database; multiple writers permitted.
    Networked,
}

/// Configured host-path aliases for container-style mount points (§4.2),
/// e.g. `/data` → `{project_root}/data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MountAliases(pub HashMap<String, String>);

/// The enumerated configuration record mandated in place of a reflective
/// config object: every tunable the core depends on has an explicit,
/// named field.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PipeworksCoreConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub stage_weights: StageWeights,
    pub stage_timeouts: StageTimeouts,
    pub webhook_retry_policy: WebhookRetryPolicy,
    pub db_kind: DbKind,
    pub mount_aliases: MountAliases,
    pub project_root: String,
    pub stuck_scan_interval: Duration,
}

impl Default for PipeworksCoreConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            queue_capacity: 2,
            stage_weights: StageWeights::default(),
            stage_timeouts: StageTimeouts::default(),
            webhook_retry_policy: WebhookRetryPolicy::default(),
            db_kind: DbKind::Embedded,
            mount_aliases: MountAliases::default(),
            project_root: ".".into(),
            stuck_scan_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stage_weights_sum_to_one() {
        let w = StageWeights::default();
        let sum = w.transcription + w.enrichment + w.rendering + w.clip_discovery;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn webhook_retry_policy_has_three_backoff_entries() {
        let policy = WebhookRetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff.len(), 3);
    }
}
