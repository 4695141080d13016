use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;
