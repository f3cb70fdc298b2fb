//! Database driver implementations.
//!
//! - [`mysql`]: MySQL primary store (sqlx)
//! - [`mssql`]: SQL Server secondary store (tiberius + bb8)
//! - [`memory`]: in-process stores for local runs and tests
//! - [`common`]: shared helpers
//!
//! Callers work with `Arc<dyn PrimaryStore>` / `Arc<dyn SecondaryStore>`
//! chosen from the `type` field of each store's config.

pub mod common;
pub mod memory;
pub mod mssql;
pub mod mysql;

use std::sync::Arc;

pub use memory::{MemoryPrimary, MemorySecondary};
pub use mssql::{MssqlDialect, MssqlSecondary};
pub use mysql::{MysqlDialect, MysqlPrimary};

use crate::config::Config;
use crate::core::traits::{PrimaryStore, SecondaryStore};
use crate::error::{Result, SyncError};

/// Connect the primary store named by `config.primary.type`.
pub async fn connect_primary(config: &Config) -> Result<Arc<dyn PrimaryStore>> {
    match config.primary.r#type.as_str() {
        "mysql" => Ok(Arc::new(
            MysqlPrimary::new(&config.primary, &config.sync).await?,
        )),
        "memory" => Ok(Arc::new(MemoryPrimary::new())),
        other => Err(SyncError::Config(format!(
            "Unknown primary store type: '{}'. Supported types: mysql, memory",
            other
        ))),
    }
}

/// Connect the secondary store named by `config.secondary.type`.
pub async fn connect_secondary(config: &Config) -> Result<Arc<dyn SecondaryStore>> {
    match config.secondary.r#type.as_str() {
        "mssql" => Ok(Arc::new(
            MssqlSecondary::new(&config.secondary, &config.sync).await?,
        )),
        "memory" => Ok(Arc::new(MemorySecondary::new(
            config.secondary.payload_width,
        ))),
        other => Err(SyncError::Config(format!(
            "Unknown secondary store type: '{}'. Supported types: mssql, memory",
            other
        ))),
    }
}
