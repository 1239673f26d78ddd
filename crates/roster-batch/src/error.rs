use roster_remote::RemoteError;
use roster_storage::StoreError;
use thiserror::Error;

/// Batch-level failures. Per-item failures never surface here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("operation requires at least one target user")]
    EmptyTargets,
    #[error("project is not resolved")]
    UnresolvedProject,
    #[error("a batch is already running")]
    AlreadyRunning,
    #[error("local store error: {0}")]
    Store(#[from] StoreError),
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),
}

impl BatchError {
    /// True for errors raised before any remote call was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BatchError::EmptyTargets | BatchError::UnresolvedProject | BatchError::AlreadyRunning
        )
    }
}
