//! Shared fixtures for controller tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use reel_media::{FfmpegCommand, FfmpegExecutor, MediaError, MediaResult};
use reel_models::{ProjectId, ProjectSettings, RenderProject, Resolution};
use reel_store::{InMemoryProjectStore, ProjectStore};
use reel_worker::{RenderConfig, RenderContext, RenderController};

/// PNG signature followed by a marker so fixtures are distinguishable.
pub fn png(marker: &str) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(marker.as_bytes());
    bytes
}

/// An image the fake encoder refuses to decode.
pub fn corrupt() -> Vec<u8> {
    b"CORRUPT image data".to_vec()
}

/// An image the fake encoder takes a while to render.
pub fn slow() -> Vec<u8> {
    b"SLOW image data".to_vec()
}

/// One encoder invocation as seen by [`FakeExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: String,
    pub inputs: Vec<PathBuf>,
    pub filter: Option<String>,
    pub args: Vec<String>,
}

impl RecordedCall {
    pub fn input_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect()
    }

    /// Value following `flag` in the output arguments.
    pub fn arg(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Encoder stand-in: writes a small output file for every command.
///
/// Clip renders fail for inputs starting with `CORRUPT` and are delayed for
/// inputs starting with `SLOW`. Whole stages can be made to fail, and an
/// optional gate holds every command until permits are added.
#[derive(Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<RecordedCall>>,
    failing_stages: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every command until the returned semaphore gets a permit.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let executor = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (executor, gate)
    }

    pub fn fail_stage(&self, stage: &str) {
        self.failing_stages.lock().unwrap().insert(stage.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_stages.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.stage == stage)
            .collect()
    }
}

#[async_trait]
impl FfmpegExecutor for FakeExecutor {
    async fn execute(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| MediaError::internal("gate closed"))?;
        }

        let call = RecordedCall {
            stage: cmd.stage().to_string(),
            inputs: cmd.inputs().iter().map(|i| i.path.clone()).collect(),
            filter: cmd.filter_graph().map(str::to_string),
            args: cmd.build_args(),
        };
        self.calls.lock().unwrap().push(call.clone());

        if self.failing_stages.lock().unwrap().contains(&call.stage) {
            return Err(MediaError::ffmpeg_failed(
                format!("{} exited with status 1", call.stage),
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }

        if call.stage == "ken_burns" {
            let source = tokio::fs::read(&call.inputs[0]).await?;
            if source.starts_with(b"CORRUPT") {
                return Err(MediaError::ffmpeg_failed(
                    "ken_burns exited with status 1",
                    Some("Invalid data found when processing input".to_string()),
                    Some(1),
                ));
            }
            if source.starts_with(b"SLOW") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        tokio::fs::write(cmd.output(), format!("{}:{}", call.stage, call.inputs.len())).await?;
        Ok(())
    }
}

/// Controller wired to an in-memory store, a fake encoder and scratch dirs.
pub struct Harness {
    pub controller: RenderController,
    pub store: Arc<InMemoryProjectStore>,
    pub executor: Arc<FakeExecutor>,
    pub work_dir: TempDir,
    pub output_dir: TempDir,
}

impl Harness {
    pub fn new(executor: FakeExecutor) -> Self {
        Self::with_config(executor, |config| config)
    }

    pub fn with_config(
        executor: FakeExecutor,
        configure: impl FnOnce(RenderConfig) -> RenderConfig,
    ) -> Self {
        let work_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();
        let config = configure(
            RenderConfig::default()
                .with_work_dir(work_dir.path())
                .with_output_dir(output_dir.path()),
        );

        let store = Arc::new(InMemoryProjectStore::new());
        let executor = Arc::new(executor);
        let ctx = RenderContext::new(config, store.clone(), executor.clone());

        Self {
            controller: RenderController::new(ctx),
            store,
            executor,
            work_dir,
            output_dir,
        }
    }

    /// Insert a project with `images` and default settings.
    pub async fn project(&self, images: Vec<Vec<u8>>) -> ProjectId {
        self.insert(RenderProject::new("test", ProjectSettings::default()).with_images(images))
            .await
    }

    pub async fn project_at(&self, images: Vec<Vec<u8>>, duration: u32, resolution: Resolution) -> ProjectId {
        let settings = ProjectSettings::new(duration, 0.8, resolution).unwrap();
        self.insert(RenderProject::new("test", settings).with_images(images))
            .await
    }

    pub async fn insert(&self, project: RenderProject) -> ProjectId {
        let id = project.id.clone();
        self.store.insert_project(project).await.unwrap();
        id
    }

    pub async fn stored(&self, id: &ProjectId) -> RenderProject {
        self.store.get_project(id).await.unwrap()
    }

    pub fn output_files(&self) -> Vec<String> {
        dir_entries(self.output_dir.path())
    }

    pub fn leftover_workspaces(&self) -> Vec<String> {
        dir_entries(self.work_dir.path())
    }
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
