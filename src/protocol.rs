//! Request/response types exchanged with the daemon.

use crate::store::StoreError;
use crate::types::{Entity, Epic, Kind, Subtask, Task};
use serde::{Deserialize, Serialize};

/// Request sent to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    CreateTask { task: Task },
    CreateEpic { epic: Epic },
    CreateSubtask { subtask: Subtask },

    UpdateTask { task: Task },
    UpdateEpic { epic: Epic },
    UpdateSubtask { subtask: Subtask },

    /// Get one entity of a kind by ID. Records the view in history.
    Get { kind: Kind, id: u64 },

    /// List all entities of a kind.
    List { kind: Kind },

    /// List the subtasks of one epic.
    EpicSubtasks { id: u64 },

    /// Delete one entity. Unknown ids succeed.
    Delete { kind: Kind, id: u64 },

    /// Delete every entity of a kind.
    Clear { kind: Kind },

    /// Scheduled entities by start time.
    Prioritized,

    /// Recently viewed entities, oldest first.
    History,

    /// Shutdown the daemon.
    Shutdown,
}

/// Response sent back by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Single entity response.
    Entity { entity: Entity },

    /// Multiple entities response.
    Entities { entities: Vec<Entity> },

    /// A new entity was stored.
    Created { entity: Entity },

    /// An existing entity was replaced.
    Updated { entity: Entity },

    /// Entity, or the epic a subtask points at, does not exist.
    NotFound { message: String },

    /// Requested time slot overlaps another entity.
    Conflict { message: String },

    /// Submitted entity failed validation.
    Invalid { message: String },

    /// Operation succeeded.
    Ok,

    /// Error response.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Map a failed store operation onto the matching response.
    pub fn from_report(report: &eyre::Report) -> Self {
        let message = report.to_string();
        match report.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound { .. }) | Some(StoreError::InvalidReference { .. }) => {
                Self::NotFound { message }
            }
            Some(StoreError::SchedulingConflict { .. }) => Self::Conflict { message },
            Some(StoreError::Validation(_)) => Self::Invalid { message },
            Some(StoreError::Persistence(_)) | None => Self::error(format!("{:#}", report)),
        }
    }
}
