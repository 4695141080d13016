use std::path::Path;

use pipeworks_models::{Episode, EpisodeDraft};
use pipeworks_registry::{Registry, RegistryResult};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Content-hash uniqueness (C8). The actual "same hash, same path is a
/// no-op; same hash, new path is a move; new hash is a new episode" rule
/// set falls entirely out of `Registry::register_episode`'s upsert-on-hash
/// behavior, so this only computes the hash and delegates.
#[derive(Debug, Clone)]
pub struct DedupIndex {
    registry: Registry,
}

impl DedupIndex {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Streams the file in 64 KiB chunks and returns its hex-encoded
    /// SHA-256 digest.
    pub async fn hash_file(path: &Path) -> std::io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Registers `draft` (with `content_hash` already populated by
    /// `hash_file`) as an episode, or returns the existing episode if the
    /// hash already exists.
    pub async fn register(&self, draft: EpisodeDraft) -> RegistryResult<Episode> {
        self.registry.register_episode(draft).await
    }
}
