//! ArtifactStore (C4): the filesystem layout for per-episode output trees,
//! plus the cleanup primitives CleanupManager (C11) builds on.

pub mod error;
pub mod paths;
pub mod store;

pub use error::{ArtifactError, ArtifactResult};
pub use paths::ArtifactPaths;
pub use store::ArtifactStore;
