//! Render error types.

use thiserror::Error;

use reel_media::MediaError;
use reel_models::{ModelError, ProjectId, ProjectStatus};
use reel_store::StoreError;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("A generation is already running for project {0}")]
    AlreadyProcessing(ProjectId),

    #[error("Failed to write job assets: {0}")]
    AssetWrite(#[source] MediaError),

    #[error("Clip {index} failed to render: {source}")]
    ClipRender {
        index: usize,
        #[source]
        source: MediaError,
    },

    #[error("No clips rendered from {attempted} images")]
    NoClipsRendered { attempted: usize },

    #[error("Composition failed: {0}")]
    Composition(#[source] MediaError),

    #[error("Mux failed: {0}")]
    Mux(#[source] MediaError),

    #[error("Failed to publish output: {0}")]
    Publish(#[source] MediaError),

    #[error("Illegal status change from {from} to {to}")]
    InvalidTransition { from: ProjectStatus, to: ProjectStatus },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ModelError> for RenderError {
    fn from(e: ModelError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl RenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Pipeline stage the error belongs to, used as a log and metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            RenderError::Validation(_)
            | RenderError::ProjectNotFound(_)
            | RenderError::AlreadyProcessing(_) => "precondition",
            RenderError::AssetWrite(_) => "materialize",
            RenderError::ClipRender { .. } | RenderError::NoClipsRendered { .. } => "clips",
            RenderError::Composition(_) => "compose",
            RenderError::Mux(_) => "mux",
            RenderError::Publish(_) | RenderError::Io(_) => "publish",
            RenderError::Store(_) | RenderError::InvalidTransition { .. } => "store",
        }
    }

    /// True for errors raised before the project enters `processing`.
    pub fn is_precondition(&self) -> bool {
        self.stage() == "precondition"
    }

    /// Message including the encoder's last log line, when available.
    pub fn detailed_message(&self) -> String {
        let media = match self {
            RenderError::AssetWrite(e)
            | RenderError::ClipRender { source: e, .. }
            | RenderError::Composition(e)
            | RenderError::Mux(e)
            | RenderError::Publish(e) => e,
            _ => return self.to_string(),
        };
        match media.stderr_tail().and_then(|tail| tail.lines().last()) {
            Some(line) => format!("{}: {}", self, line),
            None => self.to_string(),
        }
    }
}
