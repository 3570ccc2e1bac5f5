//! The storage collaborator seen by the render controller.

use async_trait::async_trait;

use reel_models::{ProjectId, ProjectSettings, ProjectStatus, RenderProject};

use crate::error::{StoreError, StoreResult};

/// Persistent project records.
///
/// Mutating operations fail with [`StoreError::NotFound`] when the
/// project does not exist.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load a project, `None` if it does not exist.
    async fn find_project(&self, id: &ProjectId) -> StoreResult<Option<RenderProject>>;

    /// Set the lifecycle status.
    async fn update_status(&self, id: &ProjectId, status: ProjectStatus) -> StoreResult<()>;

    /// Record where the last rendered video can be retrieved.
    async fn update_output_reference(&self, id: &ProjectId, url: &str) -> StoreResult<()>;

    /// Create a new project record.
    async fn insert_project(&self, project: RenderProject) -> StoreResult<()>;

    /// All projects, newest first.
    async fn list_projects(&self) -> StoreResult<Vec<RenderProject>>;

    /// Replace the render settings, returning the updated project.
    async fn update_settings(
        &self,
        id: &ProjectId,
        settings: ProjectSettings,
    ) -> StoreResult<RenderProject>;

    /// Replace the image list.
    async fn set_images(&self, id: &ProjectId, images: Vec<Vec<u8>>) -> StoreResult<()>;

    async fn set_logo(&self, id: &ProjectId, logo: Vec<u8>) -> StoreResult<()>;

    async fn set_music(&self, id: &ProjectId, music: Vec<u8>) -> StoreResult<()>;

    /// Remove a project record.
    async fn delete_project(&self, id: &ProjectId) -> StoreResult<()>;

    /// Load a project, failing if it does not exist.
    async fn get_project(&self, id: &ProjectId) -> StoreResult<RenderProject> {
        self.find_project(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Newest first, ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(projects: &mut [RenderProject]) {
    projects.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
