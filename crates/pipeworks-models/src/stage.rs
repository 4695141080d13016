use serde::{Deserialize, Serialize};

/// The declared, ordered phases of episode processing.
///
/// Ordering matches the declaration order in the data model: an episode's
/// stage may only move forward through this sequence except via an explicit
/// force-reprocess, which resets it before re-running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovered,
    Prepared,
    Transcribed,
    Enriched,
    Rendered,
    ClipsDiscovered,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Discovered,
        Stage::Prepared,
        Stage::Transcribed,
        Stage::Enriched,
        Stage::Rendered,
        Stage::ClipsDiscovered,
    ];

    /// The stage immediately following this one in the declared order, if any.
    pub fn next(self) -> Option<Stage> {
        Self::ORDER.iter().position(|s| *s == self).and_then(|i| Self::ORDER.get(i + 1).copied())
    }

    /// Every stage strictly between `self` (exclusive) and `target` (inclusive),
    /// in order. Empty if `target <= self`.
    pub fn range_to(self, target: Stage) -> Vec<Stage> {
        Self::ORDER.iter().copied().filter(|s| *s > self && *s <= target).collect()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Discovered => "discovered",
            Stage::Prepared => "prepared",
            Stage::Transcribed => "transcribed",
            Stage::Enriched => "enriched",
            Stage::Rendered => "rendered",
            Stage::ClipsDiscovered => "clips_discovered",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(Stage::Discovered),
            "prepared" => Ok(Stage::Prepared),
            "transcribed" => Ok(Stage::Transcribed),
            "enriched" => Ok(Stage::Enriched),
            "rendered" => Ok(Stage::Rendered),
            "clips_discovered" => Ok(Stage::ClipsDiscovered),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering_is_monotonic_along_declared_sequence() {
        assert!(Stage::Discovered < Stage::Prepared);
        assert!(Stage::Prepared < Stage::Transcribed);
        assert!(Stage::Transcribed < Stage::Enriched);
        assert!(Stage::Enriched < Stage::Rendered);
        assert!(Stage::Rendered < Stage::ClipsDiscovered);
    }

    #[test]
    fn range_to_is_empty_when_target_not_after_current() {
        assert!(Stage::Enriched.range_to(Stage::Prepared).is_empty());
        assert!(Stage::Enriched.range_to(Stage::Enriched).is_empty());
    }

    #[test]
    fn range_to_enumerates_intervening_stages() {
        assert_eq!(
            Stage::Discovered.range_to(Stage::Enriched),
            vec![Stage::Prepared, Stage::Transcribed, Stage::Enriched]
        );
    }

    #[test]
    fn display_and_parse_round_trip() {
        for stage in Stage::ORDER {
            let parsed: Stage = stage.to_string().parse().unwrap();
            assert_eq!(parsed, stage);
        }
    }
}
