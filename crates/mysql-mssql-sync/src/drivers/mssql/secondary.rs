//! SQL Server secondary store client.
//!
//! Uses Tiberius with bb8 connection pooling. Each record is applied with a
//! single-row MERGE, in input order, on one pooled connection.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use super::dialect::MssqlDialect;
use crate::config::{SecondaryConfig, SyncConfig};
use crate::core::page::{Page, PageRequest};
use crate::core::record::Record;
use crate::core::traits::SecondaryStore;
use crate::drivers::common::with_timeout;
use crate::error::{Result, SyncError};

/// Connection pool timeouts.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// SQL Server error numbers we classify explicitly.
const ERR_INVALID_OBJECT: u32 = 208;
const ERR_DUPLICATE_KEY: u32 = 2627;
const ERR_TRUNCATION: u32 = 8152;
const ERR_TRUNCATION_VERBOSE: u32 = 2628;
const ERR_CANNOT_OPEN_DATABASE: u32 = 4060;
const ERR_LOGIN_FAILED: u32 = 18456;

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: SecondaryConfig,
}

impl TiberiusConnectionManager {
    fn new(config: SecondaryConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }
        if self.config.trust_server_cert {
            config.trust_cert();
        }

        config
    }
}

fn io_error(e: std::io::Error, message: Option<&str>) -> tiberius::error::Error {
    tiberius::error::Error::Io {
        kind: e.kind(),
        message: match message {
            Some(m) => format!("{}: {}", m, e),
            None => e.to_string(),
        },
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| io_error(e, None))?;
        tcp.set_nodelay(true).ok();

        let std_tcp = tcp
            .into_std()
            .map_err(|e| io_error(e, Some("Failed to detach socket")))?;
        let socket = socket2::Socket::from(std_tcp);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on SQL Server connection: {}", e);
        }

        let std_tcp: std::net::TcpStream = socket.into();
        std_tcp.set_nonblocking(true).ok();
        let tcp = TcpStream::from_std(std_tcp)
            .map_err(|e| io_error(e, Some("Failed to convert socket")))?;

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Classify a Tiberius error into the sync error taxonomy.
fn classify(err: tiberius::error::Error, context: &str) -> SyncError {
    use tiberius::error::Error;

    let code = match &err {
        Error::Server(token) => Some(token.code()),
        _ => None,
    };
    let transport = matches!(
        err,
        Error::Io { .. } | Error::Tls(_) | Error::Routing { .. }
    );

    match code {
        Some(ERR_INVALID_OBJECT) => SyncError::Schema(format!(
            "{}: {}; run `init-schema` to create the secondary table",
            context, err
        )),
        Some(ERR_TRUNCATION) | Some(ERR_TRUNCATION_VERBOSE) | Some(ERR_DUPLICATE_KEY) => {
            SyncError::Validation(format!("{}: {}", context, err))
        }
        Some(ERR_LOGIN_FAILED) | Some(ERR_CANNOT_OPEN_DATABASE) => {
            SyncError::connection(err, context)
        }
        Some(_) => SyncError::query(err, context),
        None if transport => SyncError::connection(err, context),
        None => SyncError::query(err, context),
    }
}

/// SQL Server secondary store client.
pub struct MssqlSecondary {
    pool: Pool<TiberiusConnectionManager>,
    dialect: MssqlDialect,
    query_timeout: Duration,
}

impl MssqlSecondary {
    /// Connect to SQL Server and verify the connection.
    pub async fn new(config: &SecondaryConfig, sync: &SyncConfig) -> Result<Self> {
        if !config.encrypt {
            warn!("SQL Server encryption is disabled. Credentials will be transmitted in plaintext.");
        }

        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(sync.max_connections)
            .connection_timeout(sync.connect_timeout())
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .max_lifetime(Some(POOL_MAX_LIFETIME))
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|e| classify(e, "creating SQL Server secondary pool"))?;

        let store = Self {
            pool,
            dialect: MssqlDialect::new(&config.schema, &config.table, config.payload_width),
            query_timeout: sync.query_timeout(),
        };

        // Test connection
        store.test_connection().await?;

        info!(
            "Connected to SQL Server secondary: {}:{}/{} (pool_size={})",
            config.host, config.port, config.database, sync.max_connections
        );

        Ok(store)
    }

    /// Get a pooled connection.
    async fn get_conn(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| SyncError::connection(e, "acquiring SQL Server connection"))
    }

    fn row_to_record(row: &Row) -> Result<Record> {
        let primary_key: i64 = row
            .try_get("pk")
            .map_err(|e| SyncError::query(e, "decoding pk column"))?
            .ok_or_else(|| SyncError::query("NULL pk", "decoding pk column"))?;
        let payload: &str = row
            .try_get("payload")
            .map_err(|e| SyncError::query(e, "decoding payload column"))?
            .ok_or_else(|| SyncError::query("NULL payload", "decoding payload column"))?;
        Ok(Record {
            primary_key,
            payload: payload.to_string(),
        })
    }

    /// Apply one record on an already-acquired connection.
    async fn merge_one(
        &self,
        conn: &mut PooledConnection<'_, TiberiusConnectionManager>,
        sql: &str,
        record: &Record,
    ) -> Result<()> {
        self.dialect.check_width(record)?;

        with_timeout(self.query_timeout, "merging record", async {
            conn.execute(sql, &[&record.primary_key, &record.payload])
                .await
                .map_err(|e| classify(e, "merging record"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SecondaryStore for MssqlSecondary {
    async fn ensure_schema(&self) -> Result<()> {
        let sql = self.dialect.ensure_table_sql();

        with_timeout(self.query_timeout, "creating SQL Server table", async {
            let mut conn = self.get_conn().await?;
            conn.execute(sql.as_str(), &[])
                .await
                .map_err(|e| match classify(e, "creating SQL Server table") {
                    SyncError::Query { message, .. } => SyncError::Schema(message),
                    other => other,
                })?;
            Ok(())
        })
        .await?;

        debug!(
            "SQL Server table {} created or already exists",
            self.dialect.qualified_table()
        );
        Ok(())
    }

    async fn upsert_batch(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let sql = self.dialect.merge_sql();
        let mut conn = self.get_conn().await?;
        let mut applied = 0usize;

        for record in records {
            if let Err(e) = self.merge_one(&mut conn, &sql, record).await {
                warn!(
                    "Error upserting primary key {} into SQL Server: {}",
                    record.primary_key, e
                );
                return Err(SyncError::upsert(record.primary_key, applied, e));
            }
            applied += 1;
            debug!("Upserted primary key {}", record.primary_key);
        }

        info!(
            "Upserted {} records into {}",
            applied,
            self.dialect.qualified_table()
        );
        Ok(applied)
    }

    async fn list(&self, request: &PageRequest) -> Result<Page> {
        let search = request.search();
        let pattern = search.map(MssqlDialect::like_pattern);
        let count_sql = self.dialect.count_sql(search);
        let page_sql = self.dialect.select_page_sql(search);
        let offset = i64::try_from(request.offset())
            .map_err(|_| SyncError::Validation("page offset out of range".into()))?;
        let fetch = request.limit() as i64;

        with_timeout(self.query_timeout, "listing SQL Server records", async {
            let mut conn = self.get_conn().await?;

            let mut count_params: Vec<&dyn ToSql> = Vec::new();
            if let Some(p) = &pattern {
                count_params.push(p);
            }
            let total: i64 = conn
                .query(count_sql.as_str(), &count_params)
                .await
                .map_err(|e| classify(e, "counting SQL Server records"))?
                .into_row()
                .await
                .map_err(|e| classify(e, "counting SQL Server records"))?
                .and_then(|row| row.get::<i64, _>("cnt"))
                .unwrap_or(0);

            let mut page_params: Vec<&dyn ToSql> = Vec::new();
            if let Some(p) = &pattern {
                page_params.push(p);
            }
            page_params.push(&offset);
            page_params.push(&fetch);
            let rows = conn
                .query(page_sql.as_str(), &page_params)
                .await
                .map_err(|e| classify(e, "fetching SQL Server page"))?
                .into_first_result()
                .await
                .map_err(|e| classify(e, "fetching SQL Server page"))?;

            let items = rows
                .iter()
                .map(Self::row_to_record)
                .collect::<Result<Vec<_>>>()?;

            debug!(
                "SQL Server page {} (size {}): {} of {} records",
                request.page(),
                request.page_size(),
                items.len(),
                total
            );
            Ok(Page::new(request, items, total.max(0) as u64))
        })
        .await
    }

    async fn test_connection(&self) -> Result<()> {
        with_timeout(self.query_timeout, "testing SQL Server connection", async {
            let mut conn = self.get_conn().await?;
            conn.simple_query("SELECT 1")
                .await
                .map_err(|e| SyncError::connection(e, "testing SQL Server connection"))?
                .into_row()
                .await
                .map_err(|e| SyncError::connection(e, "testing SQL Server connection"))?;
            Ok(())
        })
        .await
    }

    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn close(&self) {
        // bb8 closes idle connections when the pool is dropped.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_address() {
        let config = SecondaryConfig {
            host: "sql.internal".to_string(),
            port: 14330,
            database: "replica".to_string(),
            user: "sa".to_string(),
            ..SecondaryConfig::default()
        };
        let manager = TiberiusConnectionManager::new(config);
        assert_eq!(manager.build_config().get_addr(), "sql.internal:14330");
    }

    #[test]
    fn test_build_config_without_encryption() {
        let config = SecondaryConfig {
            host: "localhost".to_string(),
            encrypt: false,
            trust_server_cert: false,
            ..SecondaryConfig::default()
        };
        let manager = TiberiusConnectionManager::new(config);
        assert_eq!(manager.build_config().get_addr(), "localhost:1433");
    }

    #[test]
    fn test_classify_io_error_is_connection() {
        let err = tiberius::error::Error::Io {
            kind: std::io::ErrorKind::ConnectionRefused,
            message: "refused".to_string(),
        };
        assert!(matches!(
            classify(err, "merging record"),
            SyncError::Connection { .. }
        ));
    }

    #[test]
    fn test_classify_conversion_error_is_query() {
        let err = tiberius::error::Error::Conversion("bad value".into());
        assert!(matches!(
            classify(err, "decoding"),
            SyncError::Query { .. }
        ));
    }
}
