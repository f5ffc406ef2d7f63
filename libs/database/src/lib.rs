//! Connection plumbing for the vector store backends
//!
//! # Features
//!
//! - `oceanbase` (default) - OceanBase over SeaORM's MySQL driver
//! - `config` - `core_config::FromEnv` implementations for connector configs
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::oceanbase::{self, OceanBaseConfig};
//!
//! let config = OceanBaseConfig::from_env()?;
//! let db = oceanbase::connect(&config).await?;
//! oceanbase::check_health(&db).await?;
//! ```

pub mod common;

#[cfg(feature = "oceanbase")]
pub mod oceanbase;

pub use common::{DatabaseError, DatabaseResult};
