//! FFmpeg render stages for vertical slideshows.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - A process runner with progress parsing, timeouts and kill-on-drop
//! - Job-scoped workspaces that materialize uploaded assets
//! - Ken Burns clip rendering, cross-fade composition, logo/music muxing
//! - Atomic publication of the final artifact

pub mod assets;
pub mod command;
pub mod compose;
pub mod error;
pub mod fs_utils;
pub mod ken_burns;
pub mod mux;
pub mod probe;
pub mod progress;

pub use assets::{materialize_assets, JobWorkspace, MaterializedAssets};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegExecutor, FfmpegRunner};
pub use compose::{compose_clips, ComposedVideo};
pub use error::{MediaError, MediaResult};
pub use fs_utils::publish_file;
pub use ken_burns::{clip_duration_secs, render_ken_burns_clip, RenderClip};
pub use mux::{mux_output, LogoOverlay, MuxRequest};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
