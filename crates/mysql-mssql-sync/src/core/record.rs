//! The record moved between stores.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Maximum payload length in characters, matching the primary column width.
pub const MAX_PAYLOAD_LEN: usize = 1000;

/// A single row: an integer primary key and an opaque string payload.
///
/// The primary key is the merge key in the secondary store. Driver rows are
/// mapped into this type right after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Unique key within each store.
    #[serde(alias = "pk")]
    pub primary_key: i64,

    /// Opaque payload (originally a filesystem path).
    #[serde(alias = "imagePath", alias = "image")]
    pub payload: String,
}

impl Record {
    /// Create a record without validating it.
    pub fn new(primary_key: i64, payload: impl Into<String>) -> Self {
        Self {
            primary_key,
            payload: payload.into(),
        }
    }

    /// Length of the payload in characters.
    pub fn payload_len(&self) -> usize {
        self.payload.chars().count()
    }

    /// Check the payload against [`MAX_PAYLOAD_LEN`].
    pub fn validate(&self) -> Result<()> {
        let len = self.payload_len();
        if len > MAX_PAYLOAD_LEN {
            return Err(SyncError::Validation(format!(
                "payload for primary key {} is {} characters; maximum length is {}",
                self.primary_key, len, MAX_PAYLOAD_LEN
            )));
        }
        Ok(())
    }
}

/// Validate every record in a batch, failing on the first bad one.
pub fn validate_all(records: &[Record]) -> Result<()> {
    records.iter().try_for_each(Record::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_at_limit_is_valid() {
        let record = Record::new(1, "x".repeat(MAX_PAYLOAD_LEN));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_payload_over_limit_is_rejected() {
        let record = Record::new(42, "x".repeat(MAX_PAYLOAD_LEN + 1));
        let err = record.validate().unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        // 1000 two-byte characters is still within the limit
        let record = Record::new(1, "é".repeat(MAX_PAYLOAD_LEN));
        assert_eq!(record.payload.len(), 2 * MAX_PAYLOAD_LEN);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_deserialize_accepts_legacy_field_names() {
        let record: Record = serde_json::from_str(r#"{"pk": 3, "imagePath": "/img/3.jpg"}"#).unwrap();
        assert_eq!(record, Record::new(3, "/img/3.jpg"));

        let record: Record =
            serde_json::from_str(r#"{"primary_key": 4, "payload": "/img/4.jpg"}"#).unwrap();
        assert_eq!(record, Record::new(4, "/img/4.jpg"));
    }

    #[test]
    fn test_deserialize_rejects_wrong_types() {
        let result: std::result::Result<Record, _> =
            serde_json::from_str(r#"{"primary_key": "one", "payload": "/img"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_all_stops_at_first_bad_record() {
        let records = vec![
            Record::new(1, "ok"),
            Record::new(2, "x".repeat(MAX_PAYLOAD_LEN + 1)),
            Record::new(3, "y".repeat(MAX_PAYLOAD_LEN + 1)),
        ];
        let err = validate_all(&records).unwrap_err();
        assert!(err.to_string().contains("primary key 2"));
    }
}
