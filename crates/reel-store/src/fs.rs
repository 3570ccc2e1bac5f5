//! Filesystem project store.
//!
//! Each project is one JSON document `{id}.json` in the store directory,
//! in the same shape the API serves (byte buffers as base64). Documents
//! are replaced through a temporary file and a rename. Read-modify-write
//! cycles are serialized by a store-wide lock.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use reel_models::{ProjectId, ProjectSettings, ProjectStatus, RenderProject};

use crate::error::{StoreError, StoreResult};
use crate::store::{sort_newest_first, ProjectStore};

/// Projects persisted as JSON documents in a directory.
#[derive(Debug)]
pub struct FsProjectStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsProjectStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Opened project store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &ProjectId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    async fn read_document(&self, path: &Path) -> StoreResult<Option<RenderProject>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn write_document(&self, project: &RenderProject) -> StoreResult<()> {
        let path = self.document_path(&project.id);
        let tmp = self.root.join(format!(".{}.json.tmp", project.id));
        let json = serde_json::to_vec_pretty(project)?;

        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn modify<T>(
        &self,
        id: &ProjectId,
        f: impl FnOnce(&mut RenderProject) -> T + Send,
    ) -> StoreResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut project = self
            .read_document(&self.document_path(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let result = f(&mut project);
        self.write_document(&project).await?;
        Ok(result)
    }
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn find_project(&self, id: &ProjectId) -> StoreResult<Option<RenderProject>> {
        self.read_document(&self.document_path(id)).await
    }

    async fn update_status(&self, id: &ProjectId, status: ProjectStatus) -> StoreResult<()> {
        self.modify(id, |p| p.status = status).await?;
        debug!(project_id = %id, status = %status, "Updated project status");
        Ok(())
    }

    async fn update_output_reference(&self, id: &ProjectId, url: &str) -> StoreResult<()> {
        let url = url.to_string();
        self.modify(id, move |p| p.video_url = Some(url)).await
    }

    async fn insert_project(&self, project: RenderProject) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(self.document_path(&project.id)).await? {
            return Err(StoreError::AlreadyExists(project.id));
        }
        self.write_document(&project).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<RenderProject>> {
        let mut projects = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_document {
                continue;
            }
            match self.read_document(&path).await {
                Ok(Some(project)) => projects.push(project),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable project"),
            }
        }

        sort_newest_first(&mut projects);
        Ok(projects)
    }

    async fn update_settings(
        &self,
        id: &ProjectId,
        settings: ProjectSettings,
    ) -> StoreResult<RenderProject> {
        self.modify(id, |p| {
            p.apply_settings(settings);
            p.clone()
        })
        .await
    }

    async fn set_images(&self, id: &ProjectId, images: Vec<Vec<u8>>) -> StoreResult<()> {
        self.modify(id, move |p| p.images = images).await
    }

    async fn set_logo(&self, id: &ProjectId, logo: Vec<u8>) -> StoreResult<()> {
        self.modify(id, move |p| p.logo = Some(logo)).await
    }

    async fn set_music(&self, id: &ProjectId, music: Vec<u8>) -> StoreResult<()> {
        self.modify(id, move |p| p.music_track = Some(music)).await
    }

    async fn delete_project(&self, id: &ProjectId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.document_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
