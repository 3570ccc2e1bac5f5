//! Ken Burns clip rendering.
//!
//! One still image becomes one silent clip: the image is scaled to cover
//! the portrait frame, then `zoompan` ramps the zoom by a fixed step per
//! output frame up to the clip's cap while the crop window stays centered
//! and drifts by the clip's pan offsets.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use reel_models::motion::ZOOM_STEP_PER_FRAME;
use reel_models::{EncodingConfig, FrameSize, KenBurnsParams};

use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::MediaResult;

/// A rendered clip, owned by the job that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderClip {
    /// Index of the source image in render order
    pub index: usize,
    /// Rendered video file
    pub path: PathBuf,
    /// Rendered length in seconds (`frames / fps`)
    pub duration_secs: f64,
    /// Motion used for this clip
    pub params: KenBurnsParams,
}

/// Exact length of a clip of `frames` frames at `fps`.
pub fn clip_duration_secs(frames: u32, fps: u32) -> f64 {
    if fps == 0 {
        return 0.0;
    }
    frames as f64 / fps as f64
}

/// Build the `-vf` chain for one clip.
pub fn build_ken_burns_filter(
    frame: FrameSize,
    params: &KenBurnsParams,
    frames: u32,
    fps: u32,
) -> String {
    let (w, h) = (frame.width, frame.height);
    let zoom = format!(
        "min({:.4}+{}*on,{:.4})",
        params.effective_zoom_start(),
        ZOOM_STEP_PER_FRAME,
        params.zoom_cap()
    );
    // Centered window plus a drift that grows with the zoom, kept inside the frame
    let x = format!(
        "clip(iw/2-iw/(2*zoom)+{:.1}*(1-1/zoom),0,iw-iw/zoom)",
        params.pan_x
    );
    let y = format!(
        "clip(ih/2-ih/(2*zoom)+{:.1}*(1-1/zoom),0,ih-ih/zoom)",
        params.pan_y
    );

    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,\
         zoompan=z='{zoom}':x='{x}':y='{y}':d={frames}:s={w}x{h}:fps={fps}"
    )
}

/// Render one image into a silent clip of exactly `frames` frames.
pub async fn render_ken_burns_clip(
    executor: &dyn FfmpegExecutor,
    image: &Path,
    output: &Path,
    frames: u32,
    params: &KenBurnsParams,
    frame: FrameSize,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let filter = build_ken_burns_filter(frame, params, frames, encoding.frame_rate);

    debug!(
        image = %image.display(),
        frames = frames,
        zoom_start = params.zoom_start,
        zoom_cap = params.zoom_cap(),
        pan_x = params.pan_x,
        pan_y = params.pan_y,
        "Rendering Ken Burns clip"
    );

    let cmd = FfmpegCommand::new(image, output)
        .label("ken_burns")
        .video_filter(filter)
        .frames(frames)
        .video_encoding(encoding)
        .no_audio();

    executor.execute(&cmd).await?;

    info!(
        output = %output.display(),
        duration_secs = clip_duration_secs(frames, encoding.frame_rate),
        "Ken Burns clip rendered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockFfmpegExecutor;
    use crate::error::MediaError;
    use reel_models::Resolution;

    #[test]
    fn test_clip_duration_from_frames() {
        assert_eq!(clip_duration_secs(300, 30), 10.0);
        assert!((clip_duration_secs(4, 30) - 0.1333).abs() < 1e-3);
        assert_eq!(clip_duration_secs(30, 0), 0.0);
    }

    #[test]
    fn test_filter_for_first_image() {
        let filter = build_ken_burns_filter(
            Resolution::P1080.frame_size(),
            &KenBurnsParams::for_index(0),
            300,
            30,
        );

        assert!(filter.starts_with("scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920"));
        assert!(filter.contains("z='min(1.0000+0.0015*on,1.2000)'"));
        assert!(filter.contains("iw/2-iw/(2*zoom)+0.0*(1-1/zoom)"));
        assert!(filter.contains("ih/2-ih/(2*zoom)+0.0*(1-1/zoom)"));
        assert!(filter.contains(":d=300:s=1080x1920:fps=30"));
    }

    #[test]
    fn test_filters_differ_between_adjacent_images() {
        let frame = Resolution::P720.frame_size();
        let first = build_ken_burns_filter(frame, &KenBurnsParams::for_index(0), 90, 30);
        let second = build_ken_burns_filter(frame, &KenBurnsParams::for_index(1), 90, 30);

        assert_ne!(first, second);
        assert!(second.contains("min(1.1000+0.0015*on,1.3000)"));
        assert!(second.contains("+100.0*(1-1/zoom)"));
        assert!(second.contains("s=608x1080"));
    }

    #[test]
    fn test_zoom_cap_never_exceeds_maximum() {
        let filter = build_ken_burns_filter(
            Resolution::P1080.frame_size(),
            &KenBurnsParams::for_index(9),
            30,
            30,
        );
        assert!(filter.contains("min(1.5000+0.0015*on,1.5000)"));
    }

    #[tokio::test]
    async fn test_render_builds_single_image_command() {
        let mut executor = MockFfmpegExecutor::new();
        executor
            .expect_execute()
            .withf(|cmd| {
                let args = cmd.build_args().join(" ");
                cmd.stage() == "ken_burns"
                    && cmd.inputs().len() == 1
                    && args.contains("-frames:v 150")
                    && args.contains("-an")
                    && args.ends_with("clip_000.mp4")
            })
            .times(1)
            .returning(|_| Ok(()));

        render_ken_burns_clip(
            &executor,
            Path::new("image_000.jpg"),
            Path::new("clip_000.mp4"),
            150,
            &KenBurnsParams::for_index(0),
            Resolution::P1080.frame_size(),
            &EncodingConfig::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_render_propagates_encoder_failure() {
        let mut executor = MockFfmpegExecutor::new();
        executor
            .expect_execute()
            .returning(|_| Err(MediaError::ffmpeg_failed("ken_burns exited with status 1", None, Some(1))));

        let result = render_ken_burns_clip(
            &executor,
            Path::new("broken.jpg"),
            Path::new("clip.mp4"),
            60,
            &KenBurnsParams::default(),
            Resolution::P1080.frame_size(),
            &EncodingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(MediaError::FfmpegFailed { .. })));
    }
}
