use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("collaborator failure: {0}")]
    Failure(String),

    #[error("cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type CollabResult<T> = Result<T, CollabError>;
