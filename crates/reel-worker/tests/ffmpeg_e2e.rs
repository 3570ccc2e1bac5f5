//! End-to-end renders with the system encoder.

use std::path::Path;
use std::sync::Arc;

use reel_media::{probe_video, FfmpegCommand, FfmpegRunner};
use reel_models::{ProjectSettings, ProjectStatus, RenderProject, Resolution};
use reel_store::{InMemoryProjectStore, ProjectStore};
use reel_worker::{RenderConfig, RenderContext, RenderController};

/// Render a lavfi source into `output` and return its bytes.
async fn synthesize(source: &str, output: &Path, extra_args: &[&str]) -> Vec<u8> {
    let cmd = FfmpegCommand::new(source, output)
        .input_arg("-f")
        .input_arg("lavfi")
        .output_args(extra_args.iter().copied());
    FfmpegRunner::new().run(&cmd).await.unwrap();
    tokio::fs::read(output).await.unwrap()
}

async fn still(dir: &Path, name: &str, color: &str) -> Vec<u8> {
    synthesize(
        &format!("color=c={}:s=800x600", color),
        &dir.join(name),
        &["-frames:v", "1"],
    )
    .await
}

fn controller(store: Arc<InMemoryProjectStore>, work: &Path, out: &Path) -> RenderController {
    let config = RenderConfig::default()
        .with_work_dir(work)
        .with_output_dir(out);
    RenderController::new(RenderContext::with_ffmpeg(config, store))
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_full_render_with_logo_and_music() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let images = vec![
        still(fixtures.path(), "a.png", "red").await,
        still(fixtures.path(), "b.png", "green").await,
        still(fixtures.path(), "c.png", "blue").await,
    ];
    let logo = synthesize(
        "color=c=white@0.5:s=120x60,format=rgba",
        &fixtures.path().join("logo.png"),
        &["-frames:v", "1"],
    )
    .await;
    let music = synthesize(
        "sine=frequency=440:duration=40",
        &fixtures.path().join("music.m4a"),
        &["-c:a", "aac"],
    )
    .await;

    let project = RenderProject::new("full", ProjectSettings::default())
        .with_images(images)
        .with_logo(logo)
        .with_music(music);
    let id = project.id.clone();
    let store = Arc::new(InMemoryProjectStore::with_projects([project]));

    let outcome = controller(store.clone(), work.path(), out.path())
        .generate(&id)
        .await
        .unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(
        store.get_project(&id).await.unwrap().status,
        ProjectStatus::Completed
    );

    let info = probe_video(outcome.output_path.unwrap()).await.unwrap();
    assert_eq!((info.width, info.height), (1080, 1920));
    assert!((info.duration - 29.0).abs() < 0.5, "duration {}", info.duration);
    assert_eq!(info.pixel_format, "yuv420p");
    assert!(info.has_audio());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_single_image_720p_without_extras() {
    let fixtures = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let settings = ProjectSettings::new(10, 0.8, Resolution::P720).unwrap();
    let project = RenderProject::new("short", settings)
        .with_images(vec![still(fixtures.path(), "only.png", "orange").await]);
    let id = project.id.clone();
    let store = Arc::new(InMemoryProjectStore::with_projects([project]));

    let outcome = controller(store, work.path(), out.path())
        .generate(&id)
        .await
        .unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.error);

    let info = probe_video(outcome.output_path.unwrap()).await.unwrap();
    assert_eq!((info.width, info.height), (608, 1080));
    assert!((info.duration - 10.0).abs() < 0.5, "duration {}", info.duration);
    assert!(!info.has_audio());
}
