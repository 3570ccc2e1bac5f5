//! Job workspaces and asset materialization.
//!
//! Every render job gets its own directory under the configured work root.
//! The directory name embeds the project id and a random job id, so two
//! jobs (even for the same project) never share files. The directory is
//! removed when the workspace is closed or dropped, on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use reel_models::ProjectId;

use crate::error::{MediaError, MediaResult};

/// Scoped temporary directory owned by one render job.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
    job_id: String,
}

impl JobWorkspace {
    /// Create a fresh job directory under `root`.
    pub fn create(root: &Path, project_id: &ProjectId) -> MediaResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| MediaError::asset_write(root, e))?;

        let job_id = Uuid::new_v4().simple().to_string();
        let dir = tempfile::Builder::new()
            .prefix(&format!("reel-{}-{}-", project_id, &job_id[..8]))
            .tempdir_in(root)
            .map_err(|e| MediaError::asset_write(root, e))?;

        debug!(
            project_id = %project_id,
            job_id = %job_id,
            dir = %dir.path().display(),
            "Created job workspace"
        );

        Ok(Self { dir, job_id })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Output path of the clip rendered from image `index`.
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("clip_{:03}.mp4", index))
    }

    /// Output path of the cross-faded sequence.
    pub fn composed_path(&self) -> PathBuf {
        self.path().join("composed.mp4")
    }

    /// Output path of the final muxed file, before publication.
    pub fn muxed_path(&self) -> PathBuf {
        self.path().join("final.mp4")
    }

    /// Remove the directory, reporting failures instead of swallowing them.
    pub fn close(self) -> MediaResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            warn!(dir = %path.display(), error = %e, "Failed to remove job workspace");
            MediaError::Io(e)
        })
    }
}

/// Files written for one render job.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedAssets {
    /// Image files in render order
    pub images: Vec<PathBuf>,
    pub logo: Option<PathBuf>,
    pub music: Option<PathBuf>,
}

/// Write image, logo and music buffers into the workspace.
pub async fn materialize_assets(
    workspace: &JobWorkspace,
    images: &[Vec<u8>],
    logo: Option<&[u8]>,
    music: Option<&[u8]>,
) -> MediaResult<MaterializedAssets> {
    let mut image_paths = Vec::with_capacity(images.len());
    for (index, bytes) in images.iter().enumerate() {
        let path = workspace
            .path()
            .join(format!("image_{:03}.{}", index, sniff_image_extension(bytes, "jpg")));
        write_asset(&path, bytes).await?;
        image_paths.push(path);
    }

    let logo = match logo {
        Some(bytes) => {
            let path = workspace
                .path()
                .join(format!("logo.{}", sniff_image_extension(bytes, "png")));
            write_asset(&path, bytes).await?;
            Some(path)
        }
        None => None,
    };

    let music = match music {
        Some(bytes) => {
            let path = workspace
                .path()
                .join(format!("music.{}", sniff_audio_extension(bytes)));
            write_asset(&path, bytes).await?;
            Some(path)
        }
        None => None,
    };

    debug!(
        job_id = %workspace.job_id(),
        images = image_paths.len(),
        has_logo = logo.is_some(),
        has_music = music.is_some(),
        "Materialized job assets"
    );

    Ok(MaterializedAssets {
        images: image_paths,
        logo,
        music,
    })
}

async fn write_asset(path: &Path, bytes: &[u8]) -> MediaResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| MediaError::asset_write(path, e))
}

/// File extension for an image buffer, from its magic bytes.
pub fn sniff_image_extension(bytes: &[u8], fallback: &'static str) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.starts_with(b"BM") {
        "bmp"
    } else {
        fallback
    }
}

/// File extension for an audio buffer, from its magic bytes.
pub fn sniff_audio_extension(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        "wav"
    } else if bytes.starts_with(b"OggS") {
        "ogg"
    } else if bytes.starts_with(b"fLaC") {
        "flac"
    } else if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        "m4a"
    } else {
        // ID3 tags and bare MPEG frames
        "mp3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image_extension() {
        assert_eq!(sniff_image_extension(b"\x89PNG\r\n\x1a\nrest", "jpg"), "png");
        assert_eq!(sniff_image_extension(&[0xFF, 0xD8, 0xFF, 0xE0], "png"), "jpg");
        assert_eq!(sniff_image_extension(b"RIFF\0\0\0\0WEBPVP8 ", "jpg"), "webp");
        assert_eq!(sniff_image_extension(b"garbage", "png"), "png");
    }

    #[test]
    fn test_sniff_audio_extension() {
        assert_eq!(sniff_audio_extension(b"ID3\x04\0"), "mp3");
        assert_eq!(sniff_audio_extension(b"RIFF\0\0\0\0WAVEfmt "), "wav");
        assert_eq!(sniff_audio_extension(b"OggS\0\x02"), "ogg");
        assert_eq!(sniff_audio_extension(b"\0\0\0\x20ftypM4A "), "m4a");
    }

    #[tokio::test]
    async fn test_workspaces_are_unique_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let project = ProjectId::parse("p1").unwrap();

        let first = JobWorkspace::create(root.path(), &project).unwrap();
        let second = JobWorkspace::create(root.path(), &project).unwrap();
        assert_ne!(first.path(), second.path());
        assert_ne!(first.job_id(), second.job_id());

        let first_path = first.path().to_path_buf();
        first.close().unwrap();
        assert!(!first_path.exists());

        let second_path = second.path().to_path_buf();
        drop(second);
        assert!(!second_path.exists());
    }

    #[tokio::test]
    async fn test_materialize_writes_all_assets_in_order() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(root.path(), &ProjectId::parse("p2").unwrap()).unwrap();

        let images = vec![b"\x89PNG\r\n\x1a\none".to_vec(), b"two".to_vec()];
        let assets = materialize_assets(&workspace, &images, Some(b"logo".as_slice()), Some(b"ID3music".as_slice()))
            .await
            .unwrap();

        assert_eq!(assets.images.len(), 2);
        assert!(assets.images[0].ends_with("image_000.png"));
        assert!(assets.images[1].ends_with("image_001.jpg"));
        assert_eq!(tokio::fs::read(&assets.images[1]).await.unwrap(), b"two");
        assert!(assets.logo.unwrap().ends_with("logo.png"));
        assert!(assets.music.unwrap().ends_with("music.mp3"));
    }

    #[tokio::test]
    async fn test_materialize_without_optional_assets() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(root.path(), &ProjectId::parse("p3").unwrap()).unwrap();

        let assets = materialize_assets(&workspace, &[b"img".to_vec()], None, None)
            .await
            .unwrap();
        assert!(assets.logo.is_none());
        assert!(assets.music.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_asset_write_error() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(root.path(), &ProjectId::parse("p4").unwrap()).unwrap();

        // A directory squatting on the target name makes the write fail
        std::fs::create_dir(workspace.path().join("image_000.jpg")).unwrap();

        let err = materialize_assets(&workspace, &[b"img".to_vec()], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::AssetWrite { .. }));
    }
}
