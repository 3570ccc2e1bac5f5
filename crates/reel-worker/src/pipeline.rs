//! The staged render pipeline for one job.
//!
//! materialize → clips (concurrent, bounded) → compose → mux → publish.
//! Clip failures are absorbed as long as at least one clip renders; every
//! other stage failure ends the job. The job workspace is removed on every
//! exit path.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use metrics::counter;
use tracing::debug;

use reel_media::{
    clip_duration_secs, compose_clips, materialize_assets, mux_output, publish_file,
    render_ken_burns_clip, JobWorkspace, LogoOverlay, MaterializedAssets, MediaError, MuxRequest, RenderClip,
};
use reel_models::{FrameSize, KenBurnsParams, ProjectSettings, RenderProject};

use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::logging::JobLogger;
use crate::output::output_file_name;

/// Clip render results of one run, kept even when a later stage fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipTally {
    pub rendered: usize,
    pub failed: usize,
}

/// What a successful pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Published video
    pub output_path: PathBuf,
    pub file_name: String,
    pub clips: ClipTally,
    /// Expected length of the published video
    pub duration_secs: f64,
}

/// Run every stage for `project` in a fresh job workspace.
///
/// `tally` is filled in once clips are rendered, whatever happens after.
pub async fn run_pipeline(
    ctx: &RenderContext,
    project: &RenderProject,
    logger: &JobLogger,
    tally: &mut ClipTally,
) -> RenderResult<PipelineOutput> {
    let settings = project.settings()?;
    let workspace =
        JobWorkspace::create(&ctx.config.work_dir, &project.id).map_err(RenderError::AssetWrite)?;

    let result = run_stages(ctx, project, &settings, &workspace, logger, tally).await;

    if let Err(e) = workspace.close() {
        logger.log_warning(&format!("Job workspace was not removed: {}", e));
    }
    result
}

async fn run_stages(
    ctx: &RenderContext,
    project: &RenderProject,
    settings: &ProjectSettings,
    workspace: &JobWorkspace,
    logger: &JobLogger,
    tally: &mut ClipTally,
) -> RenderResult<PipelineOutput> {
    let assets = materialize_assets(
        workspace,
        &project.images,
        project.logo.as_deref(),
        project.music_track.as_deref(),
    )
    .await
    .map_err(RenderError::AssetWrite)?;

    let attempted = assets.images.len();
    let frame = settings.resolution().frame_size();
    let frames = project.clip_frame_counts(ctx.config.encoding.frame_rate);

    let clips = render_clips(ctx, workspace, &assets.images, &frames, frame, logger).await;
    *tally = ClipTally {
        rendered: clips.len(),
        failed: attempted - clips.len(),
    };
    if clips.is_empty() {
        return Err(RenderError::NoClipsRendered { attempted });
    }
    logger.log_progress(&format!("{}/{} clips rendered", clips.len(), attempted));

    let composed = compose_clips(
        ctx.executor.as_ref(),
        &clips,
        &workspace.composed_path(),
        ctx.config.transition_secs,
        &ctx.config.encoding,
    )
    .await
    .map_err(RenderError::Composition)?;
    logger.log_progress(&format!("composed {} clips", clips.len()));

    let request = mux_request(ctx, project, &assets, &composed.path, composed.duration_secs, workspace);
    let muxed = mux_output(ctx.executor.as_ref(), &request, &ctx.config.encoding)
        .await
        .map_err(RenderError::Mux)?;

    let file_name = output_file_name(&project.id, settings.resolution());
    let output_path = ctx.config.output_dir.join(&file_name);
    publish_file(&muxed, &output_path)
        .await
        .map_err(RenderError::Publish)?;

    Ok(PipelineOutput {
        output_path,
        file_name,
        clips: *tally,
        duration_secs: composed.duration_secs,
    })
}

/// Render one clip per image, returning the successes in image order.
async fn render_clips(
    ctx: &RenderContext,
    workspace: &JobWorkspace,
    images: &[PathBuf],
    frames: &[u32],
    frame: FrameSize,
    logger: &JobLogger,
) -> Vec<RenderClip> {
    let futures = images
        .iter()
        .zip(frames)
        .enumerate()
        .map(|(index, (image, &frames))| render_clip(ctx, workspace, index, image, frames, frame));

    // join_all keeps input order whatever the completion order
    join_all(futures)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(clip) => {
                counter!("reel_clips_rendered_total", "outcome" => "rendered").increment(1);
                Some(clip)
            }
            Err(e) => {
                counter!("reel_clips_rendered_total", "outcome" => "failed").increment(1);
                logger.log_warning(&format!("{}, skipping", e.detailed_message()));
                None
            }
        })
        .collect()
}

async fn render_clip(
    ctx: &RenderContext,
    workspace: &JobWorkspace,
    index: usize,
    image: &Path,
    frames: u32,
    frame: FrameSize,
) -> RenderResult<RenderClip> {
    let _permit = ctx.clip_semaphore.acquire().await.map_err(|_| RenderError::ClipRender {
        index,
        source: MediaError::internal("Clip render permits closed"),
    })?;

    let params = KenBurnsParams::for_index(index);
    let output = workspace.clip_path(index);
    debug!(clip_index = index, frames = frames, "Rendering clip");

    render_ken_burns_clip(
        ctx.executor.as_ref(),
        image,
        &output,
        frames,
        &params,
        frame,
        &ctx.config.encoding,
    )
    .await
    .map_err(|source| RenderError::ClipRender { index, source })?;

    Ok(RenderClip {
        index,
        path: output,
        duration_secs: clip_duration_secs(frames, ctx.config.encoding.frame_rate),
        params,
    })
}

fn mux_request(
    ctx: &RenderContext,
    project: &RenderProject,
    assets: &MaterializedAssets,
    video: &Path,
    duration_secs: f64,
    workspace: &JobWorkspace,
) -> MuxRequest {
    let logo = assets.logo.as_ref().map(|path| {
        let overlay = LogoOverlay::new(path, ctx.config.logo_margin_px);
        if ctx.config.apply_logo_opacity {
            overlay.with_opacity(project.logo_opacity)
        } else {
            overlay
        }
    });

    MuxRequest {
        video: video.to_path_buf(),
        duration_secs,
        logo,
        music: assets.music.clone(),
        output: workspace.muxed_path(),
    }
}
