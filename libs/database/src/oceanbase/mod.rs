//! OceanBase connector and utilities
//!
//! OceanBase is reached through SeaORM's MySQL backend; the vector extensions
//! (`VECTOR(n)` columns, `l2_distance`, vector indexes) are plain SQL on top.

mod config;
mod connector;
mod health;

pub use config::OceanBaseConfig;
pub use connector::{connect, connect_with_options, connect_with_retry};
pub use health::check_health;

pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
