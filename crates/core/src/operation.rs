use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::ids::{
    ApplicationId, ClusterUserId, GitopsEngineInstanceId, ManagedEnvironmentId, OperationId,
};

/// Lifecycle state of an asynchronous work item.
///
/// Waiting -> In_Progress -> Completed | Failed. Terminal states are
/// absorbing: no transition out of them is ever legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    Waiting,
    InProgress,
    Completed,
    Failed,
}

impl OperationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::InProgress => "In_Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Waiting" => Ok(Self::Waiting),
            "In_Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            _ => Err(CoreError::UnknownState(s.to_string())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: OperationState) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                // Reclamation path: a presumed-dead claim is requeued.
                | (Self::InProgress, Self::Waiting)
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity an operation mutates, as a closed tagged variant.
///
/// The storage layer keeps `resource_type` as an open string tag; this
/// enum is the validation boundary where operations are created, and the
/// parse point for workers that dispatch on the target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationTarget {
    ManagedEnvironment(ManagedEnvironmentId),
    GitopsEngineInstance(GitopsEngineInstanceId),
    Application(ApplicationId),
}

impl OperationTarget {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::ManagedEnvironment(_) => "ManagedEnvironment",
            Self::GitopsEngineInstance(_) => "GitopsEngineInstance",
            Self::Application(_) => "Application",
        }
    }

    pub fn resource_id(&self) -> &str {
        match self {
            Self::ManagedEnvironment(id) => id.as_str(),
            Self::GitopsEngineInstance(id) => id.as_str(),
            Self::Application(id) => id.as_str(),
        }
    }

    pub fn from_parts(resource_type: &str, resource_id: &str) -> Result<Self, CoreError> {
        match resource_type {
            "ManagedEnvironment" => Ok(Self::ManagedEnvironment(resource_id.into())),
            "GitopsEngineInstance" => Ok(Self::GitopsEngineInstance(resource_id.into())),
            "Application" => Ok(Self::Application(resource_id.into())),
            _ => Err(CoreError::UnknownResourceType(resource_type.to_string())),
        }
    }
}

/// One persisted asynchronous mutation request.
///
/// Operations are short-lived bookkeeping rows, not an audit log:
/// terminal rows are garbage-collected after a retention window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: OperationId,
    pub seq_id: i64,

    /// Engine instance this operation runs against.
    pub instance_id: GitopsEngineInstanceId,

    /// UID of the mutated resource; `resource_type` says which table it
    /// lives in. Kept as an open tag at this layer — workers validate it
    /// against a real table via [`OperationTarget::from_parts`].
    pub resource_id: String,
    pub resource_type: String,

    /// User that initiated the operation.
    pub operation_owner_user_id: ClusterUserId,

    pub created_on: DateTime<Utc>,

    /// Refreshed on every state transition; the sole signal the
    /// reclamation sweep uses to detect abandonment.
    pub last_state_update: DateTime<Utc>,

    pub state: OperationState,

    /// Progress or error detail for humans; machine logic never reads it.
    pub human_readable_state: String,
}

impl Operation {
    /// Parse the open resource tag into a closed target, rejecting tags
    /// that match no known table.
    pub fn target(&self) -> Result<OperationTarget, CoreError> {
        OperationTarget::from_parts(&self.resource_type, &self.resource_id)
    }
}
