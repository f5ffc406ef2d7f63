//! Vector store selection and ingestion settings shared by every backend.

use std::path::PathBuf;

use crate::{env_or_default, env_parse_optional, ConfigError, FromEnv};

/// Which vector store the deployment is configured to use (`VECTOR_DB`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorDbSelection {
    pub backend: String,
}

impl VectorDbSelection {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    /// Case-insensitive comparison against a backend identifier.
    pub fn is(&self, backend: &str) -> bool {
        self.backend.trim().eq_ignore_ascii_case(backend)
    }
}

impl FromEnv for VectorDbSelection {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_or_default("VECTOR_DB", "")))
    }
}

/// Settings of the active embedding engine that affect chunking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbeddingEngineConfig {
    /// Overrides the engine's own maximum chunk length when set.
    pub max_chunk_length: Option<usize>,
}

impl FromEnv for EmbeddingEngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_chunk_length: env_parse_optional("EMBEDDING_MODEL_MAX_CHUNK_LENGTH")?,
        })
    }
}

/// Location of the on-disk vector cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorCacheConfig {
    pub directory: PathBuf,
}

impl VectorCacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl FromEnv for VectorCacheConfig {
    /// `<STORAGE_DIR>/vector-cache`, with `STORAGE_DIR` defaulting to `./storage`
    fn from_env() -> Result<Self, ConfigError> {
        let storage = env_or_default("STORAGE_DIR", "storage");
        Ok(Self::new(PathBuf::from(storage).join("vector-cache")))
    }
}
