//! Replication pipeline.
//!
//! - [`Replicator`]: reads a batch from the primary store and merges it into
//!   the secondary store
//! - [`ReplicationSource`]: which records a run copies
//! - [`ReplicationSummary`]: what a run did, serializable for `--output-json`

mod replicator;
mod summary;

pub use replicator::{ReplicationSource, Replicator};
pub use summary::{ReplicationPhase, ReplicationStatus, ReplicationSummary};
