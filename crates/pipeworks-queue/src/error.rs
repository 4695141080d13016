use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full")]
    QueueFull,

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {0} is already terminal and cannot be cancelled")]
    AlreadyTerminal(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type QueueResult<T> = Result<T, QueueError>;
