//! Configuration for the vector admin tool

use core_config::FromEnv;
use core_config::vector_db::{EmbeddingEngineConfig, VectorCacheConfig, VectorDbSelection};
use database::oceanbase::OceanBaseConfig;
use domain_vector_db::{OpenAIConfig, StoreOptions};
use eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub selection: VectorDbSelection,
    pub database: OceanBaseConfig,
    pub store: StoreOptions,
    pub openai: OpenAIConfig,
    pub engine: EmbeddingEngineConfig,
    pub cache: VectorCacheConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            selection: VectorDbSelection::from_env()?,
            database: OceanBaseConfig::from_env()?,
            store: StoreOptions::from_env()?,
            openai: OpenAIConfig::from_env()?,
            engine: EmbeddingEngineConfig::from_env()?,
            cache: VectorCacheConfig::from_env()?,
        })
    }
}
