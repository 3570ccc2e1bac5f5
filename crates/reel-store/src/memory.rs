//! In-memory project store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use reel_models::{ProjectId, ProjectSettings, ProjectStatus, RenderProject};

use crate::error::{StoreError, StoreResult};
use crate::store::{sort_newest_first, ProjectStore};

/// Projects held in a map behind an async lock.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, RenderProject>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `projects`.
    pub fn with_projects(projects: impl IntoIterator<Item = RenderProject>) -> Self {
        let map = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            projects: RwLock::new(map),
        }
    }

    async fn modify<T>(
        &self,
        id: &ProjectId,
        f: impl FnOnce(&mut RenderProject) -> T + Send,
    ) -> StoreResult<T> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(f(project))
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn find_project(&self, id: &ProjectId) -> StoreResult<Option<RenderProject>> {
        Ok(self.projects.read().await.get(id).cloned())
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
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(StoreError::AlreadyExists(project.id));
        }
        projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn list_projects(&self) -> StoreResult<Vec<RenderProject>> {
        let mut projects: Vec<_> = self.projects.read().await.values().cloned().collect();
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
        self.projects
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
