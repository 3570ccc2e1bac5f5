//! Clip composition with cross-fade transitions.

use std::path::{Path, PathBuf};
use tracing::info;

use reel_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::{MediaError, MediaResult};
use crate::ken_burns::RenderClip;

/// The continuous video produced from all rendered clips.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedVideo {
    pub path: PathBuf,
    /// Expected length after transition overlap
    pub duration_secs: f64,
    /// Number of cross-fades applied
    pub transitions: usize,
}

/// Transition length actually used for a sequence.
///
/// xfade needs every clip to outlast its fades, so the requested length
/// is limited to half of the shortest clip.
pub fn effective_transition(durations: &[f64], requested_secs: f64) -> f64 {
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    if !shortest.is_finite() {
        return 0.0;
    }
    requested_secs.min(shortest / 2.0).max(0.0)
}

/// Start time of each cross-fade in the output timeline.
///
/// Fade `i` starts where clip `i + 1` begins to overlap the accumulated
/// sequence: the sum of the first `i + 1` clip durations minus one
/// transition per fade so far.
pub fn xfade_offsets(durations: &[f64], transition_secs: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
    let mut elapsed = 0.0;
    for (i, duration) in durations.iter().take(durations.len().saturating_sub(1)).enumerate() {
        elapsed += duration;
        offsets.push(elapsed - (i as f64 + 1.0) * transition_secs);
    }
    offsets
}

/// Build the left-to-right xfade chain. The result is labelled `[vout]`.
pub fn build_xfade_filter(durations: &[f64], transition_secs: f64) -> String {
    let offsets = xfade_offsets(durations, transition_secs);
    let last = offsets.len();

    offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| {
            let left = if i == 0 {
                "[0:v]".to_string()
            } else {
                format!("[x{}]", i)
            };
            let out = if i + 1 == last {
                "[vout]".to_string()
            } else {
                format!("[x{}]", i + 1)
            };
            format!(
                "{left}[{next}:v]xfade=transition=fade:duration={transition_secs:.3}:offset={offset:.3}{out}",
                next = i + 1
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Length of the composed sequence.
pub fn composed_duration(durations: &[f64], transition_secs: f64) -> f64 {
    let total: f64 = durations.iter().sum();
    total - durations.len().saturating_sub(1) as f64 * transition_secs
}

/// Join clips in order, cross-fading at every boundary.
///
/// A single clip is returned as-is without invoking the encoder.
pub async fn compose_clips(
    executor: &dyn FfmpegExecutor,
    clips: &[RenderClip],
    output: &Path,
    transition_secs: f64,
    encoding: &EncodingConfig,
) -> MediaResult<ComposedVideo> {
    let (first, rest) = clips
        .split_first()
        .ok_or_else(|| MediaError::InvalidVideo("No clips to compose".to_string()))?;

    if rest.is_empty() {
        return Ok(ComposedVideo {
            path: first.path.clone(),
            duration_secs: first.duration_secs,
            transitions: 0,
        });
    }

    let durations: Vec<f64> = clips.iter().map(|c| c.duration_secs).collect();
    let transition = effective_transition(&durations, transition_secs);
    let filter = build_xfade_filter(&durations, transition);

    let cmd = rest
        .iter()
        .fold(FfmpegCommand::new(&first.path, output), |cmd, clip| cmd.add_input(&clip.path))
        .label("compose")
        .filter_complex(filter)
        .map("[vout]")
        .video_encoding(encoding)
        .no_audio();

    executor.execute(&cmd).await?;

    let composed = ComposedVideo {
        path: output.to_path_buf(),
        duration_secs: composed_duration(&durations, transition),
        transitions: clips.len() - 1,
    };

    info!(
        clips = clips.len(),
        transition_secs = transition,
        duration_secs = composed.duration_secs,
        "Composed clip sequence"
    );
    Ok(composed)
}
