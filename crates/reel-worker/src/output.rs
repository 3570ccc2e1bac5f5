//! Output naming and retrieval.
//!
//! A rendered video lives at `{output_dir}/{project_id}_{resolution}.mp4`.
//! The name is a pure function of project and resolution, so re-rendering
//! replaces the previous file.

use std::path::{Path, PathBuf};

use tracing::debug;

use reel_models::{ProjectId, Resolution};

use crate::error::{RenderError, RenderResult};

/// File name of the video rendered for `project_id` at `resolution`.
pub fn output_file_name(project_id: &ProjectId, resolution: Resolution) -> String {
    format!("{}_{}.mp4", project_id, resolution)
}

/// Public reference for a published file.
pub fn video_url(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}

/// Resolve a requested file name inside `output_dir`.
///
/// Only plain `.mp4` names are accepted. Returns `Ok(None)` when the name
/// is valid but no such video exists.
pub fn resolve_video_path(output_dir: &Path, file_name: &str) -> RenderResult<Option<PathBuf>> {
    if !is_plain_video_name(file_name) {
        return Err(RenderError::validation(format!(
            "Invalid video file name: {}",
            file_name
        )));
    }

    let path = output_dir.join(file_name);
    Ok(path.is_file().then_some(path))
}

fn is_plain_video_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".mp4") else {
        return false;
    };
    !stem.is_empty()
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Delete every rendered video of a project. Returns how many were removed.
pub async fn remove_project_outputs(output_dir: &Path, project_id: &ProjectId) -> RenderResult<usize> {
    let mut removed = 0;
    for resolution in Resolution::ALL {
        let path = output_dir.join(output_file_name(project_id, resolution));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed rendered video");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}
