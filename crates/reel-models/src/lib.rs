//! Shared data models for the reel renderer.
//!
//! This crate provides Serde-serializable types for:
//! - Render projects, identifiers and settings
//! - Project lifecycle status
//! - Output resolution and frame geometry
//! - Encoding profile and per-clip motion parameters

pub mod base64_serde;
pub mod encoding;
pub mod error;
pub mod motion;
pub mod project;
pub mod resolution;
pub mod status;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use motion::KenBurnsParams;
pub use project::{split_frames, ProjectId, ProjectSettings, RenderProject};
pub use resolution::{FrameSize, Resolution};
pub use status::ProjectStatus;
