//! Render configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_models::encoding::{DEFAULT_LOGO_MARGIN, DEFAULT_TRANSITION_SECS};
use reel_models::EncodingConfig;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Root under which per-job workspaces are created
    pub work_dir: PathBuf,
    /// Directory holding published videos
    pub output_dir: PathBuf,
    /// Public prefix of video references, e.g. `/api/videos`
    pub video_url_prefix: String,
    /// Maximum clips rendered at once within a job
    pub max_parallel_clips: usize,
    /// Kill an encoder that runs longer than this
    pub ffmpeg_timeout: Duration,
    /// Cross-fade length between clips
    pub transition_secs: f64,
    /// Logo distance from the bottom-right corner
    pub logo_margin_px: u32,
    /// Blend the logo at the project's opacity instead of fully opaque
    pub apply_logo_opacity: bool,
    /// Directory of the filesystem project store
    pub projects_dir: PathBuf,
    /// Output profile shared by every encode
    pub encoding: EncodingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("reel"),
            output_dir: PathBuf::from("./outputs"),
            video_url_prefix: "/api/videos".to_string(),
            max_parallel_clips: 4,
            ffmpeg_timeout: Duration::from_secs(600),
            transition_secs: DEFAULT_TRANSITION_SECS,
            logo_margin_px: DEFAULT_LOGO_MARGIN,
            apply_logo_opacity: true,
            projects_dir: PathBuf::from("./projects"),
            encoding: EncodingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup. Unset or unparsable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            work_dir: lookup("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: lookup("REEL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            video_url_prefix: lookup("REEL_VIDEO_URL_PREFIX")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.video_url_prefix),
            max_parallel_clips: lookup("REEL_MAX_PARALLEL_CLIPS")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_parallel_clips),
            ffmpeg_timeout: lookup("REEL_FFMPEG_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|n: &u64| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.ffmpeg_timeout),
            transition_secs: lookup("REEL_TRANSITION_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.transition_secs),
            logo_margin_px: lookup("REEL_LOGO_MARGIN_PX")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.logo_margin_px),
            apply_logo_opacity: lookup("REEL_APPLY_LOGO_OPACITY")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.apply_logo_opacity),
            projects_dir: lookup("REEL_PROJECTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.projects_dir),
            encoding: defaults.encoding,
        }
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> RenderConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RenderConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.output_dir, PathBuf::from("./outputs"));
        assert_eq!(config.video_url_prefix, "/api/videos");
        assert_eq!(config.max_parallel_clips, 4);
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(600));
        assert_eq!(config.transition_secs, 0.5);
        assert_eq!(config.logo_margin_px, 20);
        assert!(config.apply_logo_opacity);
        assert!(config.work_dir.ends_with("reel"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("REEL_OUTPUT_DIR", "/srv/videos"),
            ("REEL_VIDEO_URL_PREFIX", "https://cdn.example.com/v/"),
            ("REEL_MAX_PARALLEL_CLIPS", "8"),
            ("REEL_TRANSITION_SECS", "0.25"),
            ("REEL_APPLY_LOGO_OPACITY", "false"),
        ]);
        assert_eq!(config.output_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.video_url_prefix, "https://cdn.example.com/v");
        assert_eq!(config.max_parallel_clips, 8);
        assert_eq!(config.transition_secs, 0.25);
        assert!(!config.apply_logo_opacity);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("REEL_MAX_PARALLEL_CLIPS", "0"),
            ("REEL_FFMPEG_TIMEOUT_SECS", "soon"),
            ("REEL_TRANSITION_SECS", "-1"),
            ("REEL_APPLY_LOGO_OPACITY", "maybe"),
        ]);
        assert_eq!(config.max_parallel_clips, 4);
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(600));
        assert_eq!(config.transition_secs, 0.5);
        assert!(config.apply_logo_opacity);
    }
}
