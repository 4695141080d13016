use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Structured attributes extracted (or supplied) for an episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EpisodeMetadata {
    pub show_name: Option<String>,
    pub title: Option<String>,
    pub episode_number: Option<u32>,
    pub host_name: Option<String>,
    pub air_date: Option<chrono::NaiveDate>,
    pub language: Option<String>,
}

/// Word-level transcript timing. Internals beyond this are opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WordTiming {
    pub start: f64,
    pub end: f64,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Transcription {
    pub text: String,
    pub words: Vec<WordTiming>,
    pub language: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Enrichment {
    pub summary: String,
    pub takeaways: Vec<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub people: Vec<ScoredPerson>,
    /// Canonical identity fields the enrichment engine may recover from
    /// content that the filename alone didn't carry; `PipelineOrchestrator`
    /// folds these into `EpisodeMetadata` to drive the canonical-ID rename.
    #[serde(default)]
    pub show_name: Option<String>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub air_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScoredPerson {
    pub name: String,
    pub score: f32,
}

/// The input to `Registry::register_episode`: everything known at discovery time.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EpisodeDraft {
    /// Assigned by `NamingService::generate_fallback_id` before a new
    /// episode is registered; ignored on hash-collision update.
    pub episode_id: String,
    pub content_hash: String,
    pub source_path: String,
    pub file_size: u64,
    pub duration_seconds: Option<f64>,
    pub last_modified: DateTime<Utc>,
    pub metadata: EpisodeMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Episode {
    pub episode_id: String,
    pub content_hash: String,
    pub source_path: String,
    pub file_size: u64,
    pub duration_seconds: Option<f64>,
    pub last_modified: DateTime<Utc>,
    pub stage: Stage,
    pub metadata: EpisodeMetadata,
    pub transcription: Option<Transcription>,
    pub enrichment: Option<Enrichment>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    /// Whether the episode already has the declared output for `stage`.
    ///
    /// Used by StageRunner to implement skip-if-present semantics (§4.5).
    pub fn has_output_for(&self, stage: Stage) -> bool {
        self.stage >= stage
    }
}

/// A partial update applied transactionally by `Registry::update_episode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EpisodePatch {
    pub stage: Option<Stage>,
    pub source_path: Option<String>,
    pub duration_seconds: Option<f64>,
    pub metadata: Option<EpisodeMetadata>,
    pub transcription: Option<Transcription>,
    pub enrichment: Option<Enrichment>,
    pub error: Option<Option<String>>,
}

/// Optional filter applied by `Registry::list_episodes`.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct EpisodeFilter {
    pub stage: Option<Stage>,
    pub show: Option<String>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_episode(stage: Stage) -> Episode {
        Episode {
            episode_id: "show_ep1_2024-01-01".into(),
            content_hash: "hash".into(),
            source_path: "in.mp4".into(),
            file_size: 1,
            duration_seconds: None,
            last_modified: Utc::now(),
            stage,
            metadata: EpisodeMetadata::default(),
            transcription: None,
            enrichment: None,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn has_output_for_reflects_current_stage() {
        let ep = sample_episode(Stage::Transcribed);
        assert!(ep.has_output_for(Stage::Discovered));
        assert!(ep.has_output_for(Stage::Transcribed));
        assert!(!ep.has_output_for(Stage::Enriched));
    }
}
