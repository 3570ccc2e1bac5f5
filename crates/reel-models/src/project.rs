//! Render project models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::base64_serde;
use crate::error::{ModelError, ModelResult};
use crate::resolution::Resolution;
use crate::status::ProjectStatus;

/// Default target length of a generated video, in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 30;
/// Default logo blend strength.
pub const DEFAULT_LOGO_OPACITY: f32 = 0.8;

const MAX_PROJECT_ID_LEN: usize = 128;

/// Unique identifier for a render project.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, so the id can be
/// embedded in file names without any escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate and wrap an existing id.
    pub fn parse(s: impl Into<String>) -> ModelResult<Self> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.len() <= MAX_PROJECT_ID_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(s))
        } else {
            Err(ModelError::InvalidProjectId(s))
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// User-editable render settings, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSettings {
    duration: u32,
    logo_opacity: f32,
    resolution: Resolution,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_SECS,
            logo_opacity: DEFAULT_LOGO_OPACITY,
            resolution: Resolution::default(),
        }
    }
}

impl ProjectSettings {
    pub fn new(duration: u32, logo_opacity: f32, resolution: Resolution) -> ModelResult<Self> {
        if duration == 0 {
            return Err(ModelError::InvalidDuration(duration));
        }
        if !(0.0..=1.0).contains(&logo_opacity) {
            return Err(ModelError::InvalidOpacity(logo_opacity));
        }
        Ok(Self {
            duration,
            logo_opacity,
            resolution,
        })
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn logo_opacity(&self) -> f32 {
        self.logo_opacity
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// A slideshow project: ordered images plus render settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderProject {
    /// Unique project ID
    pub id: ProjectId,

    /// Display name
    pub name: String,

    /// Source images in render order
    #[serde(default, with = "base64_serde::list")]
    #[schemars(with = "Vec<String>")]
    pub images: Vec<Vec<u8>>,

    /// Target total video length in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Optional background music
    #[serde(default, with = "base64_serde::option", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub music_track: Option<Vec<u8>>,

    /// Optional logo, usually a PNG with transparency
    #[serde(default, with = "base64_serde::option", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub logo: Option<Vec<u8>>,

    /// Logo blend strength in [0, 1]
    #[serde(default = "default_logo_opacity")]
    pub logo_opacity: f32,

    /// Output quality
    #[serde(default)]
    pub resolution: Resolution,

    /// Lifecycle status
    #[serde(default)]
    pub status: ProjectStatus,

    /// Reference to the last rendered video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

fn default_logo_opacity() -> f32 {
    DEFAULT_LOGO_OPACITY
}

impl RenderProject {
    /// Create an empty draft project with the given settings.
    pub fn new(name: impl Into<String>, settings: ProjectSettings) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            images: Vec::new(),
            duration: settings.duration(),
            music_track: None,
            logo: None,
            logo_opacity: settings.logo_opacity(),
            resolution: settings.resolution(),
            status: ProjectStatus::Draft,
            video_url: None,
            created_at: Utc::now(),
        }
    }

    /// Current settings, re-validated.
    pub fn settings(&self) -> ModelResult<ProjectSettings> {
        ProjectSettings::new(self.duration, self.logo_opacity, self.resolution)
    }

    /// Replace the render settings.
    pub fn apply_settings(&mut self, settings: ProjectSettings) {
        self.duration = settings.duration();
        self.logo_opacity = settings.logo_opacity();
        self.resolution = settings.resolution();
    }

    pub fn with_images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images = images;
        self
    }

    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_music(mut self, music: Vec<u8>) -> Self {
        self.music_track = Some(music);
        self
    }

    /// Whether the project has anything to render.
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Frames allotted to each image at `fps`.
    ///
    /// The project length is split as evenly as whole frames allow and the
    /// counts sum to `duration * fps`; the first clips absorb the remainder.
    pub fn clip_frame_counts(&self, fps: u32) -> Vec<u32> {
        split_frames(self.duration.saturating_mul(fps), self.images.len())
    }
}

/// Split `total` frames over `count` clips, earlier clips taking the remainder.
///
/// Every clip gets at least one frame, so the sum only exceeds `total` when
/// there are more clips than frames.
pub fn split_frames(total: u32, count: usize) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let count_u32 = count as u32;
    let (base, remainder) = (total / count_u32, total % count_u32);
    (0..count_u32)
        .map(|i| (base + u32::from(i < remainder)).max(1))
        .collect()
}
