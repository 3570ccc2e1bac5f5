//! Stream inspection of rendered files via ffprobe.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// What ffprobe reports about a rendered video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Container duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: String,
    /// Codec of the first audio stream
    pub audio_codec: Option<String>,
}

impl VideoInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    format: ProbeFormat,
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

impl ProbeStream {
    /// Average rate, or the container's nominal rate when that is `0/0`.
    fn frame_rate(&self) -> Option<f64> {
        [&self.avg_frame_rate, &self.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|rate| parse_frame_rate(rate))
    }
}

impl TryFrom<ProbeReport> for VideoInfo {
    type Error = MediaError;

    fn try_from(report: ProbeReport) -> MediaResult<Self> {
        let stream_of = |kind: &str| report.streams.iter().find(|s| s.codec_type == kind);

        let video = stream_of("video")
            .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

        Ok(VideoInfo {
            duration: report
                .format
                .duration
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0),
            width: video.width.unwrap_or(0),
            height: video.height.unwrap_or(0),
            fps: video.frame_rate().unwrap_or(0.0),
            pixel_format: video.pix_fmt.clone().unwrap_or_default(),
            audio_codec: stream_of("audio").map(|s| s.codec_name.clone().unwrap_or_default()),
        })
    }
}

/// Inspect a rendered file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe could not read {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let report: ProbeReport = serde_json::from_slice(&output.stdout)?;
    VideoInfo::try_from(report)
}

/// `30/1`, `30000/1001` or a plain decimal.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den > 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => rate.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
    }

    #[test]
    fn test_report_of_muxed_output() {
        let json = r#"{
            "format": {"duration": "29.000000"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920,
                 "pix_fmt": "yuv420p", "r_frame_rate": "30/1", "avg_frame_rate": "0/0"},
                {"codec_type": "audio", "codec_name": "aac"}
            ]
        }"#;
        let report: ProbeReport = serde_json::from_str(json).unwrap();
        let info = VideoInfo::try_from(report).unwrap();

        assert_eq!((info.width, info.height), (1080, 1920));
        assert!((info.duration - 29.0).abs() < 1e-6);
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.pixel_format, "yuv420p");
        assert_eq!(info.audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn test_report_without_video_stream() {
        let json = r#"{"format": {}, "streams": [{"codec_type": "audio", "codec_name": "mp3"}]}"#;
        let report: ProbeReport = serde_json::from_str(json).unwrap();
        assert!(matches!(
            VideoInfo::try_from(report),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
