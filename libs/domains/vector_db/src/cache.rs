use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{CachedChunk, CachedVectors};

/// Persists computed chunk embeddings per source file so that re-ingesting an
/// unchanged file skips the embedding provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorCache: Send + Sync {
    /// Look up the cached chunks for `file_path`; a miss is `exists: false`.
    async fn cached(&self, file_path: &str) -> VectorDbResult<CachedVectors>;

    /// Store chunk batches for `file_path`, replacing any previous entry.
    async fn store(&self, chunks: &[Vec<CachedChunk>], file_path: &str) -> VectorDbResult<()>;
}

/// JSON files under a cache directory, one per source file.
///
/// The file name is the UUIDv5 (URL namespace) of the source path.
#[derive(Debug, Clone)]
pub struct FsVectorCache {
    directory: PathBuf,
}

impl FsVectorCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_config(config: &core_config::vector_db::VectorCacheConfig) -> Self {
        Self::new(config.directory.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, file_path: &str) -> PathBuf {
        let key = Uuid::new_v5(&Uuid::NAMESPACE_URL, file_path.as_bytes());
        self.directory.join(format!("{}.json", key))
    }
}

#[async_trait]
impl VectorCache for FsVectorCache {
    async fn cached(&self, file_path: &str) -> VectorDbResult<CachedVectors> {
        if file_path.is_empty() {
            return Ok(CachedVectors::miss());
        }

        let path = self.entry_path(file_path);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CachedVectors::miss());
            }
            Err(e) => {
                return Err(VectorDbError::Cache(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let chunks: Vec<Vec<CachedChunk>> = serde_json::from_slice(&bytes).map_err(|e| {
            VectorDbError::Cache(format!("corrupt cache entry {}: {}", path.display(), e))
        })?;

        debug!(file = file_path, batches = chunks.len(), "Vector cache hit");
        Ok(CachedVectors::hit(chunks))
    }

    async fn store(&self, chunks: &[Vec<CachedChunk>], file_path: &str) -> VectorDbResult<()> {
        if file_path.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| VectorDbError::Cache(e.to_string()))?;

        let path = self.entry_path(file_path);
        let body = serde_json::to_vec(chunks)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| VectorDbError::Cache(format!("failed to write {}: {}", path.display(), e)))?;

        info!(file = file_path, entry = %path.display(), "Stored vectors in cache");
        Ok(())
    }
}
