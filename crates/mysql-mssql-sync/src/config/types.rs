//! Configuration type definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::page::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::core::record::MAX_PAYLOAD_LEN;
use crate::core::traits::DEFAULT_READ_BATCH_SIZE;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Primary store (MySQL) configuration.
    pub primary: PrimaryConfig,

    /// Secondary store (SQL Server) configuration.
    pub secondary: SecondaryConfig,

    /// Paging, pooling and timeout settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// A configuration backed by in-memory stores on both sides.
    pub fn memory() -> Self {
        Self {
            primary: PrimaryConfig {
                r#type: "memory".to_string(),
                ..PrimaryConfig::default()
            },
            secondary: SecondaryConfig {
                r#type: "memory".to_string(),
                ..SecondaryConfig::default()
            },
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Primary store (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// Store type: "mysql" or "memory".
    #[serde(default = "default_mysql")]
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Records table (default: "records").
    #[serde(default = "default_table")]
    pub table: String,

    /// SSL mode: disable, prefer, require, verify-ca, verify-full (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            r#type: default_mysql(),
            host: String::new(),
            port: default_mysql_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            table: default_table(),
            ssl_mode: default_prefer(),
        }
    }
}

impl fmt::Debug for PrimaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimaryConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("table", &self.table)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Secondary store (SQL Server) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Store type: "mssql" or "memory".
    #[serde(default = "default_mssql")]
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target schema (default: "dbo").
    #[serde(default = "default_dbo_schema")]
    pub schema: String,

    /// Records table (default: "records").
    #[serde(default = "default_table")]
    pub table: String,

    /// Encrypt connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust server certificate (default: true).
    #[serde(default = "default_true")]
    pub trust_server_cert: bool,

    /// Declared payload column width in UTF-16 code units (default: 2000, so any
    /// payload the primary accepts fits). `None` means NVARCHAR(MAX).
    #[serde(default = "default_payload_width")]
    pub payload_width: Option<usize>,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            r#type: default_mssql(),
            host: String::new(),
            port: default_mssql_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            schema: default_dbo_schema(),
            table: default_table(),
            encrypt: true,
            trust_server_cert: true,
            payload_width: default_payload_width(),
        }
    }
}

impl fmt::Debug for SecondaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("table", &self.table)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("payload_width", &self.payload_width)
            .finish()
    }
}

/// Paging, pooling and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Page size when the caller gives none (default: 50).
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest accepted page size (default: 1000).
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Rows per keyset read when replicating the whole primary table.
    #[serde(default = "default_read_batch_size")]
    pub read_batch_size: usize,

    /// Pool size for each store (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds before a single store call is abandoned (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            read_batch_size: default_read_batch_size(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_timeout_secs(),
            query_timeout_secs: default_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: "127.0.0.1:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

// Default value functions for serde
fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_mssql() -> String {
    "mssql".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_table() -> String {
    "records".to_string()
}

fn default_dbo_schema() -> String {
    "dbo".to_string()
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_true() -> bool {
    true
}

fn default_payload_width() -> Option<usize> {
    Some(MAX_PAYLOAD_LEN * 2)
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_read_batch_size() -> usize {
    DEFAULT_READ_BATCH_SIZE
}

fn default_max_connections() -> u32 {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
