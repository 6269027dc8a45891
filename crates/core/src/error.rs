use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown operation state: {0}")]
    UnknownState(String),

    #[error("unknown health value: {0}")]
    UnknownHealth(String),

    #[error("unknown sync status: {0}")]
    UnknownSyncStatus(String),

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
}
