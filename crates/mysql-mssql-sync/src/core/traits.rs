//! Store traits used by the replication pipeline and the HTTP layer.
//!
//! - [`PrimaryStore`]: the source of records (MySQL, or memory)
//! - [`SecondaryStore`]: the merge target (SQL Server, or memory)
//!
//! Implementations own their connection pools; every call acquires a pooled
//! connection and releases it on return, whatever the outcome.

use async_trait::async_trait;

use super::page::{Page, PageRequest};
use super::record::Record;
use crate::error::Result;

/// Default chunk size for [`PrimaryStore::read_all`].
pub const DEFAULT_READ_BATCH_SIZE: usize = 1000;

/// Read and write access to the primary store.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Create the records table if it does not exist. Idempotent.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert one record.
    ///
    /// Fails with `DuplicateKey` when the primary key already exists; the
    /// store is left unchanged in that case.
    async fn insert(&self, record: &Record) -> Result<()>;

    /// Fetch one page ordered by primary key, with the filtered total count.
    async fn list(&self, request: &PageRequest) -> Result<Page>;

    /// Keyset read: up to `limit` records with primary key greater than
    /// `after` (or from the start), ordered by primary key.
    async fn read_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<Record>>;

    /// Read every record in primary key order, `batch_size` rows at a time.
    async fn read_all(&self, batch_size: usize) -> Result<Vec<Record>> {
        let batch_size = batch_size.max(1);
        let mut records = Vec::new();
        let mut after = None;
        loop {
            let chunk = self.read_after(after, batch_size).await?;
            let done = chunk.len() < batch_size;
            after = chunk.last().map(|r| r.primary_key);
            records.extend(chunk);
            if done || after.is_none() {
                break;
            }
        }
        Ok(records)
    }

    /// Check that the store is reachable.
    async fn test_connection(&self) -> Result<()>;

    /// Store type identifier (e.g., "mysql", "memory").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// Merge access to the secondary store.
#[async_trait]
pub trait SecondaryStore: Send + Sync {
    /// Create the target table if it does not exist. Idempotent and safe to
    /// call before every batch.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert-or-update each record by primary key, sequentially in input
    /// order.
    ///
    /// Returns the number of records applied. On the first failing record the
    /// rest of the batch is skipped and `SyncError::Upsert` is returned,
    /// carrying that record's key and how many records were applied before
    /// it. Earlier records are not rolled back.
    async fn upsert_batch(&self, records: &[Record]) -> Result<usize>;

    /// Fetch one page ordered by primary key, with the filtered total count.
    async fn list(&self, request: &PageRequest) -> Result<Page>;

    /// Check that the store is reachable.
    async fn test_connection(&self) -> Result<()>;

    /// Store type identifier (e.g., "mssql", "memory").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}
