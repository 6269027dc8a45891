use gitopsdb_core::OperationState;
use gitopsdb_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid operation state transition: {from} -> {to}")]
    InvalidTransition {
        from: OperationState,
        to: OperationState,
    },

    #[error("timed out waiting for {url} after {waited_secs}s")]
    Timeout { url: String, waited_secs: u64 },
}
