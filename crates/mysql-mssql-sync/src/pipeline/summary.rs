//! Replication outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Where a replication call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationPhase {
    Idle,
    Reading,
    Writing,
    Completed,
    Failed,
}

impl std::fmt::Display for ReplicationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplicationPhase::Idle => "idle",
            ReplicationPhase::Reading => "reading",
            ReplicationPhase::Writing => "writing",
            ReplicationPhase::Completed => "completed",
            ReplicationPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final status of a replication run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationStatus {
    Completed,
    Failed,
}

/// Result of a replication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: ReplicationStatus,

    /// Records read from the primary (or supplied) for this run.
    pub records_attempted: usize,

    /// Records merged into the secondary.
    pub succeeded: usize,

    /// Key of the record that stopped the batch, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_primary_key: Option<i64>,

    /// Failure description, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl ReplicationSummary {
    pub(crate) fn completed(
        run_id: String,
        started_at: DateTime<Utc>,
        records_attempted: usize,
        succeeded: usize,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            run_id,
            status: ReplicationStatus::Completed,
            records_attempted,
            succeeded,
            failed_primary_key: None,
            error: None,
            started_at,
            completed_at,
            duration_seconds: seconds_between(started_at, completed_at),
        }
    }

    /// Summary for a batch that stopped part-way. `error` is the
    /// `SyncError::Upsert` returned by the secondary store.
    pub(crate) fn partial(
        run_id: String,
        started_at: DateTime<Utc>,
        records_attempted: usize,
        error: &SyncError,
    ) -> Self {
        let (succeeded, failed_primary_key, message) = match error {
            SyncError::Upsert {
                primary_key,
                applied,
                source,
            } => (
                *applied,
                Some(*primary_key),
                format!("{}: {}", error, source),
            ),
            _ => (0, None, error.to_string()),
        };
        let completed_at = Utc::now();
        Self {
            run_id,
            status: ReplicationStatus::Failed,
            records_attempted,
            succeeded,
            failed_primary_key,
            error: Some(message),
            started_at,
            completed_at,
            duration_seconds: seconds_between(started_at, completed_at),
        }
    }

    /// True when every attempted record was applied.
    pub fn is_success(&self) -> bool {
        self.status == ReplicationStatus::Completed
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_summary_reads_upsert_error() {
        let err = SyncError::upsert(9, 4, SyncError::Validation("too wide".into()));
        let summary = ReplicationSummary::partial("run".into(), Utc::now(), 10, &err);
        assert_eq!(summary.status, ReplicationStatus::Failed);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed_primary_key, Some(9));
        let message = summary.error.unwrap();
        assert!(message.contains("primary key 9"));
        assert!(message.contains("too wide"));
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = ReplicationSummary::completed("run-1".into(), Utc::now(), 2, 2);
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"status\": \"completed\""));
        assert!(json.contains("\"run_id\": \"run-1\""));
        assert!(!json.contains("failed_primary_key"));
        assert!(summary.is_success());
    }
}
