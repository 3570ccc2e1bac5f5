//! Project lifecycle status.
//!
//! A project starts in `Draft`, enters `Processing` when a generation run
//! begins and always leaves it for one of the terminal states. Terminal
//! projects may be regenerated, which re-enters `Processing`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Project processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Project created, never rendered
    #[default]
    Draft,
    /// A generation run is in flight
    Processing,
    /// Last generation produced an output file
    Completed,
    /// Last generation failed
    Failed,
}

impl ProjectStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }

    /// Whether a generation run may start from this state.
    pub fn can_start_generation(&self) -> bool {
        !matches!(self, ProjectStatus::Processing)
    }

    /// Check whether `next` is a legal transition from this state.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        match (self, next) {
            (ProjectStatus::Processing, ProjectStatus::Completed | ProjectStatus::Failed) => true,
            (ProjectStatus::Processing, _) => false,
            (_, ProjectStatus::Processing) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ProjectStatus::Draft),
            "processing" => Ok(ProjectStatus::Processing),
            "completed" => Ok(ProjectStatus::Completed),
            "failed" => Ok(ProjectStatus::Failed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}
