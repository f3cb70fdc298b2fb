//! Primary-to-secondary replication.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::summary::{ReplicationPhase, ReplicationSummary};
use crate::core::page::PageRequest;
use crate::core::record::{validate_all, Record};
use crate::core::traits::{PrimaryStore, SecondaryStore, DEFAULT_READ_BATCH_SIZE};
use crate::error::{Result, SyncError};

/// Which records a replication run copies.
#[derive(Debug, Clone)]
pub enum ReplicationSource {
    /// Every primary record, read in keyset batches.
    All,
    /// One page of the primary store.
    Page(PageRequest),
    /// Records supplied by the caller; validated before use.
    Records(Vec<Record>),
}

/// Copies records from the primary store into the secondary store.
///
/// Each call runs `Idle → Reading → Writing → Completed | Failed`. The
/// latest transition is published on a watch channel.
pub struct Replicator {
    primary: Arc<dyn PrimaryStore>,
    secondary: Arc<dyn SecondaryStore>,
    read_batch_size: usize,
    phase: watch::Sender<ReplicationPhase>,
}

impl Replicator {
    pub fn new(primary: Arc<dyn PrimaryStore>, secondary: Arc<dyn SecondaryStore>) -> Self {
        let (phase, _) = watch::channel(ReplicationPhase::Idle);
        Self {
            primary,
            secondary,
            read_batch_size: DEFAULT_READ_BATCH_SIZE,
            phase,
        }
    }

    /// Set the chunk size used for full-table reads.
    pub fn with_read_batch_size(mut self, size: usize) -> Self {
        self.read_batch_size = size.max(1);
        self
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<ReplicationPhase> {
        self.phase.subscribe()
    }

    /// Most recent phase.
    pub fn phase(&self) -> ReplicationPhase {
        *self.phase.borrow()
    }

    fn transition(&self, run_id: &str, phase: ReplicationPhase) {
        info!("Replication {}: {}", run_id, phase);
        self.phase.send_replace(phase);
    }

    async fn read(&self, source: ReplicationSource) -> Result<Vec<Record>> {
        match source {
            ReplicationSource::All => self.primary.read_all(self.read_batch_size).await,
            ReplicationSource::Page(request) => Ok(self.primary.list(&request).await?.items),
            ReplicationSource::Records(records) => {
                validate_all(&records)?;
                Ok(records)
            }
        }
    }

    /// Run one replication.
    ///
    /// Read and schema failures return `Err` and leave the secondary store
    /// untouched. A batch that stops part-way returns `Ok` with a failed
    /// summary; records before the failing one stay applied. Re-running is
    /// safe since the merge is idempotent.
    pub async fn replicate(&self, source: ReplicationSource) -> Result<ReplicationSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        self.transition(&run_id, ReplicationPhase::Reading);
        let records = match self.read(source).await {
            Ok(records) => records,
            Err(e) => {
                error!("Replication {}: read failed: {}", run_id, e);
                self.transition(&run_id, ReplicationPhase::Failed);
                return Err(e);
            }
        };
        info!(
            "Replication {}: {} records read from {}",
            run_id,
            records.len(),
            self.primary.db_type()
        );

        self.transition(&run_id, ReplicationPhase::Writing);
        if let Err(e) = self.secondary.ensure_schema().await {
            error!("Replication {}: schema setup failed: {}", run_id, e);
            self.transition(&run_id, ReplicationPhase::Failed);
            return Err(e);
        }

        match self.secondary.upsert_batch(&records).await {
            Ok(applied) => {
                self.transition(&run_id, ReplicationPhase::Completed);
                let summary =
                    ReplicationSummary::completed(run_id, started_at, records.len(), applied);
                info!(
                    "Replication {}: {} of {} records merged into {} in {:.1}s",
                    summary.run_id,
                    summary.succeeded,
                    summary.records_attempted,
                    self.secondary.db_type(),
                    summary.duration_seconds
                );
                Ok(summary)
            }
            Err(e @ SyncError::Upsert { .. }) => {
                self.transition(&run_id, ReplicationPhase::Failed);
                let summary = ReplicationSummary::partial(run_id, started_at, records.len(), &e);
                warn!(
                    "Replication {}: stopped at primary key {:?} after {} record(s): {}",
                    summary.run_id,
                    summary.failed_primary_key,
                    summary.succeeded,
                    e.format_detailed()
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Replication {}: write failed: {}", run_id, e);
                self.transition(&run_id, ReplicationPhase::Failed);
                Err(e)
            }
        }
    }
}
