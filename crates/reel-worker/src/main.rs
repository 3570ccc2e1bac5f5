//! Slideshow render worker binary.
//!
//! Usage: `reel-worker <project-id>...`

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use reel_media::{check_ffmpeg, probe_video};
use reel_models::ProjectId;
use reel_store::FsProjectStore;
use reel_worker::logging::init_tracing;
use reel_worker::{RenderConfig, RenderContext, RenderController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let project_ids: Vec<String> = std::env::args().skip(1).collect();
    if project_ids.is_empty() {
        eprintln!("usage: reel-worker <project-id>...");
        std::process::exit(2);
    }

    let config = RenderConfig::from_env();
    info!("Render config: {:?}", config);

    let ffmpeg = check_ffmpeg().context("ffmpeg is required to render videos")?;
    info!(path = %ffmpeg.display(), "Using ffmpeg");

    let store = FsProjectStore::open(&config.projects_dir)
        .await
        .with_context(|| format!("opening project store {}", config.projects_dir.display()))?;
    let controller = RenderController::new(RenderContext::with_ffmpeg(config, Arc::new(store)));

    let mut failures = 0;
    for raw in &project_ids {
        let project_id = match ProjectId::parse(raw.as_str()) {
            Ok(id) => id,
            Err(e) => {
                error!("{}", e);
                failures += 1;
                continue;
            }
        };

        match controller.generate(&project_id).await {
            Ok(outcome) if outcome.is_success() => {
                if let Some(path) = &outcome.output_path {
                    report_published(path).await;
                }
                println!(
                    "{}\tcompleted\t{}",
                    project_id,
                    outcome.video_url.unwrap_or_default()
                );
            }
            Ok(outcome) => {
                println!(
                    "{}\tfailed\t{}",
                    project_id,
                    outcome.error.unwrap_or_default()
                );
                failures += 1;
            }
            Err(e) => {
                error!(project_id = %project_id, "Generation rejected: {}", e);
                println!("{}\trejected\t{}", project_id, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        error!("{} of {} generations failed", failures, project_ids.len());
        std::process::exit(1);
    }

    info!("All generations completed");
    Ok(())
}

/// Log what the published file actually contains.
async fn report_published(path: &Path) {
    match probe_video(path).await {
        Ok(video) => info!(
            path = %path.display(),
            duration_secs = video.duration,
            width = video.width,
            height = video.height,
            fps = video.fps,
            has_audio = video.has_audio(),
            "Published video"
        ),
        Err(e) => warn!(path = %path.display(), "Could not inspect published video: {}", e),
    }
}
