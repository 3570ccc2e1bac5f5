//! Publication of finished artifacts.
//!
//! Rendered files are built inside the job workspace and only appear at
//! their final path through a rename, so readers of the output directory
//! never observe a partially written video.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// EXDEV on Linux and macOS.
const CROSS_DEVICE_ERRNO: i32 = 18;

/// Move `src` to `dst`, replacing any previous file at `dst`.
///
/// Falls back to copying into a sibling `.partial` file and renaming it
/// when the two paths live on different filesystems.
pub async fn publish_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.exists() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => {
            debug!(src = %src.display(), dst = %dst.display(), "Published file");
            Ok(())
        }
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE_ERRNO) => {
            debug!(src = %src.display(), dst = %dst.display(), "Cross-device publish, copying");
            copy_then_rename(src, dst).await
        }
        Err(e) => Err(MediaError::Io(e)),
    }
}

async fn copy_then_rename(src: &Path, dst: &Path) -> MediaResult<()> {
    let staging = partial_path(dst);

    if let Err(e) = fs::copy(src, &staging).await {
        let _ = fs::remove_file(&staging).await;
        return Err(MediaError::Io(e));
    }
    if let Err(e) = fs::rename(&staging, dst).await {
        let _ = fs::remove_file(&staging).await;
        return Err(MediaError::Io(e));
    }

    // The source lives in a job workspace that is removed anyway
    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), error = %e, "Failed to remove source after copy");
    }
    Ok(())
}

fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    dst.with_file_name(name)
}
