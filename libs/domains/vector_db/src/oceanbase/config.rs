use core_config::{env_or_default, env_parse, ConfigError, FromEnv};

use crate::models::DistanceMetric;

/// Physical layout of namespace tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Prepended to the namespace name to form the table name
    pub table_prefix: String,
    pub distance: DistanceMetric,
    /// Create an HNSW index with each table and query with `APPROXIMATE`
    pub vector_index: bool,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_vector_index(mut self, enabled: bool) -> Self {
        self.vector_index = enabled;
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table_prefix: "VTB_".to_string(),
            distance: DistanceMetric::Euclidean,
            vector_index: true,
        }
    }
}

impl FromEnv for StoreOptions {
    /// `OB_TABLE_PREFIX`, `OB_DISTANCE` (l2 | cosine), `OB_VECTOR_INDEX`
    fn from_env() -> Result<Self, ConfigError> {
        let distance = env_or_default("OB_DISTANCE", "l2")
            .parse::<DistanceMetric>()
            .map_err(|details| ConfigError::ParseError {
                key: "OB_DISTANCE".to_string(),
                details,
            })?;

        Ok(Self {
            table_prefix: env_or_default("OB_TABLE_PREFIX", "VTB_"),
            distance,
            vector_index: env_parse("OB_VECTOR_INDEX", true)?,
        })
    }
}
