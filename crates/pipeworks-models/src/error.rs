use thiserror::Error;

/// The shared error taxonomy (§7). Each crate that touches I/O or external
/// collaborators wraps its own error type into this one at the boundary, and
/// `pipeworks-api::error::ApiError` is the single place that maps it to an
/// HTTP status.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("lock timeout: {0}")]
    LockTimeout(String),

    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),

    #[error("artifact io error: {0}")]
    ArtifactIoError(String),

    #[error("queue full")]
    QueueFull,

    #[error("cancelled")]
    Cancelled,

    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Whether this kind should ever surface as a `tracing::error!` per §7's
    /// propagation policy (Validation/NotFound/Cancelled are routine).
    pub fn is_actionable(&self) -> bool {
        !matches!(self, CoreError::Validation(_) | CoreError::NotFound(_) | CoreError::Cancelled)
    }
}
