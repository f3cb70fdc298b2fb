//! In-memory stores.
//!
//! Selected with `type: memory` in the config. They follow the same contracts
//! as the SQL drivers (ordering, search, duplicate and width checks), which
//! makes them usable for local runs and for tests without a database.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::core::page::{Page, PageRequest};
use crate::core::record::Record;
use crate::core::traits::{PrimaryStore, SecondaryStore};
use crate::error::{Result, SyncError};

/// Slice one page out of a key-ordered map.
fn page_of(rows: &BTreeMap<i64, String>, request: &PageRequest) -> Page {
    let matching: Vec<Record> = rows
        .iter()
        .map(|(pk, payload)| Record::new(*pk, payload.clone()))
        .filter(|r| request.search().map_or(true, |s| s.matches(r)))
        .collect();
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
        .take(request.limit() as usize)
        .collect();
    Page::new(request, items, total)
}

/// Primary store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryPrimary {
    rows: RwLock<BTreeMap<i64, String>>,
}

impl MemoryPrimary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, bypassing validation.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            rows: RwLock::new(
                records
                    .into_iter()
                    .map(|r| (r.primary_key, r.payload))
                    .collect(),
            ),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimary {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        record.validate()?;

        let mut rows = self.rows.write().await;
        if rows.contains_key(&record.primary_key) {
            return Err(SyncError::DuplicateKey(record.primary_key));
        }
        rows.insert(record.primary_key, record.payload.clone());
        debug!("Stored record {} in memory", record.primary_key);
        Ok(())
    }

    async fn list(&self, request: &PageRequest) -> Result<Page> {
        Ok(page_of(&*self.rows.read().await, request))
    }

    async fn read_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<Record>> {
        let lower = match after {
            Some(pk) => Bound::Excluded(pk),
            None => Bound::Unbounded,
        };
        let rows = self.rows.read().await;
        Ok(rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(pk, payload)| Record::new(*pk, payload.clone()))
            .collect())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}

/// Secondary store held in process memory.
///
/// `payload_width` mirrors the NVARCHAR(n) column width, counted in UTF-16
/// code units; `None` is unbounded.
#[derive(Debug)]
pub struct MemorySecondary {
    rows: RwLock<BTreeMap<i64, String>>,
    payload_width: Option<usize>,
}

impl Default for MemorySecondary {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemorySecondary {
    pub fn new(payload_width: Option<usize>) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            payload_width,
        }
    }

    /// Every stored record in primary key order.
    pub async fn records(&self) -> Vec<Record> {
        self.rows
            .read()
            .await
            .iter()
            .map(|(pk, payload)| Record::new(*pk, payload.clone()))
            .collect()
    }

    fn check_width(&self, record: &Record) -> Result<()> {
        if let Some(width) = self.payload_width {
            let units: usize = record.payload.chars().map(char::len_utf16).sum();
            if units > width {
                return Err(SyncError::Validation(format!(
                    "payload for primary key {} is {} UTF-16 units; column allows {}",
                    record.primary_key, units, width
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SecondaryStore for MemorySecondary {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_batch(&self, records: &[Record]) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let mut applied = 0usize;
        for record in records {
            if let Err(e) = self.check_width(record) {
                warn!(
                    "Error upserting primary key {} into memory: {}",
                    record.primary_key, e
                );
                return Err(SyncError::upsert(record.primary_key, applied, e));
            }
            rows.insert(record.primary_key, record.payload.clone());
            applied += 1;
        }
        Ok(applied)
    }

    async fn list(&self, request: &PageRequest) -> Result<Page> {
        Ok(page_of(&*self.rows.read().await, request))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}
