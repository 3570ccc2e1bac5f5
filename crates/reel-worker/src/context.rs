//! Shared state for render jobs.

use std::sync::Arc;

use tokio::sync::Semaphore;

use reel_media::{FfmpegExecutor, FfmpegRunner};
use reel_store::ProjectStore;

use crate::config::RenderConfig;

/// Everything a render job needs, constructed once and passed in.
pub struct RenderContext {
    pub config: RenderConfig,
    pub store: Arc<dyn ProjectStore>,
    pub executor: Arc<dyn FfmpegExecutor>,
    /// Bounds concurrent clip encodes across all jobs
    pub clip_semaphore: Arc<Semaphore>,
}

impl RenderContext {
    pub fn new(
        config: RenderConfig,
        store: Arc<dyn ProjectStore>,
        executor: Arc<dyn FfmpegExecutor>,
    ) -> Self {
        let clip_semaphore = Arc::new(Semaphore::new(config.max_parallel_clips.max(1)));
        Self {
            config,
            store,
            executor,
            clip_semaphore,
        }
    }

    /// Context backed by the system `ffmpeg` with the configured timeout.
    pub fn with_ffmpeg(config: RenderConfig, store: Arc<dyn ProjectStore>) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout.as_secs());
        Self::new(config, store, Arc::new(runner))
    }
}
