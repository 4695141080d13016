use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{CollabError, CollabResult};
use crate::traits::{MediaInfo, MediaProbe};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// The real `ffprobe`-backed implementation of the prep stage's media
/// probe interface. Systems plumbing, not a modeling concern, so unlike
/// STT/LLM/segmentation/rendering it is implemented directly rather than
/// stubbed.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe;

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> CollabResult<MediaInfo> {
        if !path.exists() {
            return Err(CollabError::Failure(format!("file not found: {}", path.display())));
        }

        which::which("ffprobe").map_err(|_| CollabError::Failure("ffprobe not found on PATH".into()))?;

        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CollabError::Failure(e.to_string()))?;

        if !output.status.success() {
            return Err(CollabError::Failure(format!("ffprobe exited non-zero: {}", String::from_utf8_lossy(&output.stderr))));
        }

        let probe: FfprobeOutput = serde_json::from_slice(&output.stdout).map_err(|e| CollabError::Failure(e.to_string()))?;

        let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

        let duration = probe.format.duration.as_ref().and_then(|d| d.parse::<f64>().ok()).unwrap_or(0.0);
        let size = probe.format.size.as_ref().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let bitrate = probe.format.bit_rate.as_ref().and_then(|b| b.parse::<u64>().ok());

        let fps = video_stream
            .and_then(|s| s.avg_frame_rate.as_ref().or(s.r_frame_rate.as_ref()))
            .and_then(|r| parse_frame_rate(r));

        Ok(MediaInfo {
            duration_seconds: duration,
            width: video_stream.and_then(|s| s.width),
            height: video_stream.and_then(|s| s.height),
            fps,
            codec: video_stream.and_then(|s| s.codec_name.clone()),
            file_size: size,
            bitrate,
        })
    }
}

fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}
