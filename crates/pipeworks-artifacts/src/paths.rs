use std::path::PathBuf;

use pipeworks_models::{AspectRatio, ClipId, ClipVariant, Episode};
use pipeworks_naming::NamingService;

/// The on-disk layout for one episode's artifacts:
///
/// ```text
/// {root}/outputs/{show}/{YYYY}/{episode_id}/clips/{clip_id}/{aspect}_{variant}.mp4
/// {root}/outputs/{show}/{YYYY}/{episode_id}/html/index.html
/// {root}/outputs/{show}/{YYYY}/{episode_id}/social/{platform}/...
/// {root}/transcripts/{txt|json|vtt}/{episode_id}.*
/// {root}/_uncategorized/{episode_id}/...   # when the show is unknown
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub episode_dir: PathBuf,
    pub html_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub social_dir: PathBuf,
    pub transcript_txt: PathBuf,
    pub transcript_json: PathBuf,
    pub transcript_vtt: PathBuf,
}

impl ArtifactPaths {
    pub fn clip_asset_path(&self, clip_id: ClipId, aspect: AspectRatio, variant: ClipVariant) -> PathBuf {
        let variant_name = match variant {
            ClipVariant::Clean => "clean",
            ClipVariant::Subtitled => "subtitled",
            ClipVariant::Branded => "branded",
        };
        self.clips_dir.join(clip_id.to_string()).join(format!("{}_{variant_name}.mp4", aspect.as_folder_name()))
    }

    pub fn social_platform_dir(&self, platform: &str) -> PathBuf {
        self.social_dir.join(platform)
    }
}

pub fn paths_for(root: &str, episode: &Episode) -> ArtifactPaths {
    let year = NamingService::parse_episode_id(&episode.episode_id).map(|(_, _, date)| date.format("%Y").to_string());
    let show = episode.metadata.show_name.clone();

    let episode_dir = match (&show, &year) {
        (Some(show), Some(year)) => PathBuf::from(root).join("outputs").join(show).join(year).join(&episode.episode_id),
        _ => PathBuf::from(root).join(pipeworks_naming::UNCATEGORIZED).join(&episode.episode_id),
    };

    let transcripts_root = PathBuf::from(root).join("transcripts");

    ArtifactPaths {
        html_dir: episode_dir.join("html"),
        clips_dir: episode_dir.join("clips"),
        social_dir: episode_dir.join("social"),
        transcript_txt: transcripts_root.join("txt").join(format!("{}.txt", episode.episode_id)),
        transcript_json: transcripts_root.join("json").join(format!("{}.json", episode.episode_id)),
        transcript_vtt: transcripts_root.join("vtt").join(format!("{}.vtt", episode.episode_id)),
        episode_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pipeworks_models::{EpisodeMetadata, Stage};

    fn sample(show: Option<&str>, id: &str) -> Episode {
        Episode {
            episode_id: id.into(),
            content_hash: "h".into(),
            source_path: "in.mp4".into(),
            file_size: 1,
            duration_seconds: None,
            last_modified: Utc::now(),
            stage: Stage::Discovered,
            metadata: EpisodeMetadata { show_name: show.map(String::from), ..Default::default() },
            transcription: None,
            enrichment: None,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn known_show_routes_under_outputs_show_year() {
        let ep = sample(Some("ForumDailyNews"), "ForumDailyNews_ep140_2024-10-27");
        let paths = paths_for("/root", &ep);
        assert_eq!(paths.episode_dir, PathBuf::from("/root/outputs/ForumDailyNews/2024/ForumDailyNews_ep140_2024-10-27"));
        assert_eq!(paths.html_dir, paths.episode_dir.join("html"));
    }

    #[test]
    fn unknown_show_routes_to_uncategorized() {
        let ep = sample(None, "raw-source_1700000000");
        let paths = paths_for("/root", &ep);
        assert_eq!(paths.episode_dir, PathBuf::from("/root/_uncategorized/raw-source_1700000000"));
    }

    #[test]
    fn transcripts_are_rooted_independently_of_show() {
        let ep = sample(None, "raw-source_1700000000");
        let paths = paths_for("/root", &ep);
        assert_eq!(paths.transcript_txt, PathBuf::from("/root/transcripts/txt/raw-source_1700000000.txt"));
    }
}
