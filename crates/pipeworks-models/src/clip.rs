use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Discovered,
    Rendering,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClipMetadata {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Clip {
    pub clip_id: ClipId,
    pub episode_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f32,
    pub status: ClipStatus,
    pub metadata: ClipMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clip {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClipVariant {
    Clean,
    Subtitled,
    Branded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_folder_name(self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16x9",
            AspectRatio::Vertical => "9x16",
            AspectRatio::Square => "1x1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClipAsset {
    pub clip_id: ClipId,
    pub variant: ClipVariant,
    pub aspect_ratio: AspectRatio,
    pub output_path: String,
    pub file_size: Option<u64>,
    pub status: AssetStatus,
}

/// A candidate surfaced by the segmentation collaborator before it is
/// persisted as a `Clip` row.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClipCandidate {
    pub start_ms: u64,
    pub end_ms: u64,
    pub score: f32,
    pub metadata: ClipMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_is_end_minus_start() {
        let clip = Clip {
            clip_id: ClipId::new(),
            episode_id: "e".into(),
            start_ms: 1_000,
            end_ms: 4_500,
            score: 0.9,
            status: ClipStatus::Discovered,
            metadata: ClipMetadata::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(clip.duration_ms(), 3_500);
    }

    #[test]
    fn aspect_ratio_folder_names_are_filesystem_safe() {
        assert_eq!(AspectRatio::Vertical.as_folder_name(), "9x16");
        assert_eq!(AspectRatio::Widescreen.as_folder_name(), "16x9");
        assert_eq!(AspectRatio::Square.as_folder_name(), "1x1");
    }
}
