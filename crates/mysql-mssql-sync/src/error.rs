//! Error types for the sync library.

use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for invalid input.
pub const EXIT_VALIDATION_ERROR: u8 = 2;
/// Exit code for connection failures.
pub const EXIT_CONNECTION_ERROR: u8 = 3;
/// Exit code for schema errors.
pub const EXIT_SCHEMA_ERROR: u8 = 4;
/// Exit code for failed writes (duplicate key, failed upsert).
pub const EXIT_WRITE_ERROR: u8 = 5;
/// Exit code for other query failures.
pub const EXIT_QUERY_ERROR: u8 = 6;
/// Exit code for IO errors (missing files, etc.).
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or oversized input, rejected before any store access
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Primary store insert conflict
    #[error("Record with primary key {0} already exists")]
    DuplicateKey(i64),

    /// Transport, authentication, pool or timeout failure
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Target table missing and could not be created
    #[error("Schema error: {0}")]
    Schema(String),

    /// A record failed during batch replication
    #[error("Upsert failed for primary key {primary_key} after {applied} record(s) were applied")]
    Upsert {
        primary_key: i64,
        applied: usize,
        #[source]
        source: Box<SyncError>,
    },

    /// Any other statement failure
    #[error("Query failed: {message}\n  Context: {context}")]
    Query { message: String, context: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error with context about where it occurred
    pub fn query(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Query {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap a per-record failure from a batch upsert.
    pub fn upsert(primary_key: i64, applied: usize, source: SyncError) -> Self {
        SyncError::Upsert {
            primary_key,
            applied,
            source: Box::new(source),
        }
    }

    /// True for errors caused by the caller's input rather than a store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }

    /// HTTP status code for the boundary layer.
    pub fn http_status(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Message that is safe to return to external callers.
    ///
    /// Store-specific detail (hosts, driver messages) stays in the logs.
    pub fn public_message(&self, fallback: &str) -> String {
        match self {
            SyncError::Validation(_) | SyncError::DuplicateKey(_) => self.to_string(),
            SyncError::Upsert { primary_key, .. } => {
                format!("{}: record with primary key {} could not be written", fallback, primary_key)
            }
            _ => fallback.to_string(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) => EXIT_CONFIG_ERROR,
            SyncError::Validation(_) | SyncError::Json(_) => EXIT_VALIDATION_ERROR,
            SyncError::Connection { .. } => EXIT_CONNECTION_ERROR,
            SyncError::Schema(_) => EXIT_SCHEMA_ERROR,
            SyncError::DuplicateKey(_) | SyncError::Upsert { .. } => EXIT_WRITE_ERROR,
            SyncError::Query { .. } => EXIT_QUERY_ERROR,
            SyncError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
