//! # mysql-mssql-sync
//!
//! Keeps a SQL Server table in step with a MySQL table of `(pk, payload)`
//! records.
//!
//! - **Primary store** (MySQL): validated inserts and paginated, searchable
//!   listing
//! - **Secondary store** (SQL Server): on-demand table creation and per-record
//!   MERGE upserts
//! - **Replication**: all rows, one page, or a supplied list, with a summary
//!   of what was applied
//! - **HTTP service** exposing the above as JSON routes
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_mssql_sync::{connect_primary, connect_secondary, Config, ReplicationSource, Replicator};
//!
//! #[tokio::main]
//! async fn main() -> mysql_mssql_sync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let primary = connect_primary(&config).await?;
//!     let secondary = connect_secondary(&config).await?;
//!     let summary = Replicator::new(primary, secondary)
//!         .replicate(ReplicationSource::All)
//!         .await?;
//!     println!("Replicated {} records", summary.succeeded);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod pipeline;
pub mod server;

// Re-exports for convenient access
pub use crate::core::{
    Page, PageRequest, PrimaryStore, Record, SearchFilter, SecondaryStore, MAX_PAYLOAD_LEN,
};
pub use config::{Config, PrimaryConfig, SecondaryConfig, ServerConfig, SyncConfig};
pub use drivers::{connect_primary, connect_secondary, MemoryPrimary, MemorySecondary};
pub use error::{Result, SyncError};
pub use pipeline::{
    ReplicationPhase, ReplicationSource, ReplicationStatus, ReplicationSummary, Replicator,
};
pub use server::SyncServer;
