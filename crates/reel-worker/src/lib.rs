//! Slideshow render worker.
//!
//! This crate provides:
//! - The render job controller and its project status machine
//! - The staged pipeline (materialize, clips, compose, mux, publish)
//! - Output naming and retrieval helpers
//! - Environment configuration and structured job logging

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;

pub use config::RenderConfig;
pub use context::RenderContext;
pub use controller::{RenderController, RenderOutcome};
pub use error::{RenderError, RenderResult};
pub use logging::JobLogger;
pub use output::{output_file_name, remove_project_outputs, resolve_video_path, video_url};
