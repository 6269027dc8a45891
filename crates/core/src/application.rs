use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{ApplicationId, GitopsEngineInstanceId, ManagedEnvironmentId};

/// A deployable unit: the declared application the engine reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: ApplicationId,
    pub seq_id: i64,

    pub name: String,

    /// User-controlled specification blob, stored whole rather than
    /// decomposed into columns.
    pub spec_field: String,

    /// Engine instance the application is hosted on.
    pub engine_instance_inst_id: GitopsEngineInstanceId,

    /// Managed environment the application targets.
    pub managed_environment_id: ManagedEnvironmentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Progressing,
    Degraded,
    Suspended,
    Missing,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Progressing => "Progressing",
            Self::Degraded => "Degraded",
            Self::Suspended => "Suspended",
            Self::Missing => "Missing",
            Self::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Healthy" => Ok(Self::Healthy),
            "Progressing" => Ok(Self::Progressing),
            "Degraded" => Ok(Self::Degraded),
            "Suspended" => Ok(Self::Suspended),
            "Missing" => Ok(Self::Missing),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(CoreError::UnknownHealth(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Synced,
    OutOfSync,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "Synced",
            Self::OutOfSync => "OutOfSync",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Synced" => Ok(Self::Synced),
            "OutOfSync" => Ok(Self::OutOfSync),
            _ => Err(CoreError::UnknownSyncStatus(s.to_string())),
        }
    }
}

/// Observed status for one application, overwritten on every
/// observation cycle. One row per application, keyed by the
/// application's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationState {
    pub applicationstate_application_id: ApplicationId,
    pub seq_id: i64,

    pub health: HealthStatus,
    pub sync_status: SyncStatus,
}
