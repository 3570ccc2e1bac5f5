//! Logo overlay and background audio muxing.
//!
//! The composed sequence is always re-encoded with the fixed output
//! profile, whichever of the four branches (none, logo, music, both)
//! applies. The logo sits `margin_px` from the bottom-right corner for
//! the whole video; music becomes the only audio track and is cut at the
//! video length.

use std::path::PathBuf;
use tracing::info;

use reel_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::MediaResult;

/// Logo composited over the video.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoOverlay {
    /// Logo image, usually a PNG with transparency
    pub path: PathBuf,
    /// Distance from the right and bottom edges in pixels
    pub margin_px: u32,
    /// Alpha multiplier; `None` keeps the logo's own alpha
    pub opacity: Option<f32>,
}

impl LogoOverlay {
    pub fn new(path: impl Into<PathBuf>, margin_px: u32) -> Self {
        Self {
            path: path.into(),
            margin_px,
            opacity: None,
        }
    }

    /// Blend the logo at `opacity` (clamped to [0, 1]).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity.clamp(0.0, 1.0));
        self
    }

    /// Overlay graph reading the logo from input `input_index`, labelled `[vout]`.
    pub fn filter_graph(&self, input_index: usize) -> String {
        let m = self.margin_px;
        match self.opacity {
            Some(opacity) if opacity < 1.0 => format!(
                "[{input_index}:v]format=rgba,colorchannelmixer=aa={opacity:.2}[logo];\
                 [0:v][logo]overlay=W-w-{m}:H-h-{m}:format=auto[vout]"
            ),
            _ => format!("[0:v][{input_index}:v]overlay=W-w-{m}:H-h-{m}:format=auto[vout]"),
        }
    }
}

/// Inputs for the final encode.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxRequest {
    /// Composed, silent video
    pub video: PathBuf,
    /// Length of the composed video
    pub duration_secs: f64,
    pub logo: Option<LogoOverlay>,
    pub music: Option<PathBuf>,
    /// Destination inside the job workspace
    pub output: PathBuf,
}

/// Build the final encode for whichever branch the request describes.
pub fn build_mux_command(request: &MuxRequest, encoding: &EncodingConfig) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(&request.video, &request.output).label("mux");
    let mut next_input = 1;

    if let Some(logo) = &request.logo {
        cmd = cmd
            .add_input(&logo.path)
            .filter_complex(logo.filter_graph(next_input))
            .map("[vout]");
        next_input += 1;
    } else {
        cmd = cmd.map("0:v");
    }

    cmd = match &request.music {
        Some(music) => cmd
            .add_input(music)
            .map(format!("{}:a", next_input))
            .audio_encoding(encoding),
        None => cmd.no_audio(),
    };

    cmd.video_encoding(encoding)
        .output_duration(request.duration_secs)
        .faststart()
}

/// Produce the final encoded file at `request.output`.
pub async fn mux_output(
    executor: &dyn FfmpegExecutor,
    request: &MuxRequest,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    let cmd = build_mux_command(request, encoding);
    executor.execute(&cmd).await?;

    info!(
        output = %request.output.display(),
        has_logo = request.logo.is_some(),
        has_music = request.music.is_some(),
        duration_secs = request.duration_secs,
        "Muxed final video"
    );
    Ok(request.output.clone())
}
