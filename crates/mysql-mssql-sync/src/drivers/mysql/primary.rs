//! MySQL/MariaDB primary store client.
//!
//! Implements the `PrimaryStore` trait using SQLx for connection pooling and
//! parameterized queries.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{
    MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode,
};
use sqlx::Row;
use tracing::{debug, info, warn};

use super::dialect::MysqlDialect;
use crate::config::{PrimaryConfig, SyncConfig};
use crate::core::page::{Page, PageRequest, LIKE_ESCAPE};
use crate::core::record::Record;
use crate::core::traits::PrimaryStore;
use crate::drivers::common::with_timeout;
use crate::error::{Result, SyncError};

/// MySQL server error numbers we classify explicitly.
const ER_DBACCESS_DENIED: u16 = 1044;
const ER_ACCESS_DENIED: u16 = 1045;
const ER_NO_SUCH_TABLE: u16 = 1146;
const ER_DATA_TOO_LONG: u16 = 1406;

/// MySQL primary store client.
pub struct MysqlPrimary {
    pool: MySqlPool,
    dialect: MysqlDialect,
    table: String,
    query_timeout: Duration,
}

impl MysqlPrimary {
    /// Connect to MySQL and verify the connection.
    pub async fn new(config: &PrimaryConfig, sync: &SyncConfig) -> Result<Self> {
        let ssl_mode = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                MySqlSslMode::Disabled
            }
            "prefer" => MySqlSslMode::Preferred,
            "require" => MySqlSslMode::Required,
            "verify-ca" | "verify_ca" => MySqlSslMode::VerifyCa,
            "verify-full" | "verify_identity" => MySqlSslMode::VerifyIdentity,
            other => {
                warn!("Unknown ssl_mode '{}', defaulting to Preferred", other);
                MySqlSslMode::Preferred
            }
        };

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .charset("utf8mb4")
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(sync.max_connections)
            .acquire_timeout(sync.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| SyncError::connection(e, "creating MySQL primary pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| SyncError::connection(e, "testing MySQL primary connection"))?;

        info!(
            "Connected to MySQL primary: {}:{}/{} (pool_size={})",
            config.host, config.port, config.database, sync.max_connections
        );

        Ok(Self {
            pool,
            dialect: MysqlDialect::new(&config.table),
            table: config.table.clone(),
            query_timeout: sync.query_timeout(),
        })
    }

    /// Map a MySQL row to a `Record`.
    fn row_to_record(row: &MySqlRow) -> Result<Record> {
        let primary_key: i64 = row
            .try_get("pk")
            .map_err(|e| SyncError::query(e, "decoding pk column"))?;
        let payload: String = row
            .try_get("payload")
            .map_err(|e| SyncError::query(e, "decoding payload column"))?;
        Ok(Record {
            primary_key,
            payload,
        })
    }

    /// Classify an SQLx error into the sync error taxonomy.
    fn classify(&self, err: sqlx::Error, context: &str) -> SyncError {
        let number = err
            .as_database_error()
            .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
            .map(|e| e.number());

        match number {
            Some(ER_NO_SUCH_TABLE) => SyncError::Schema(format!(
                "table '{}' does not exist in the primary store; run `init-schema` to create it",
                self.table
            )),
            Some(ER_ACCESS_DENIED) | Some(ER_DBACCESS_DENIED) => SyncError::connection(err, context),
            Some(ER_DATA_TOO_LONG) => SyncError::Validation(format!("{}: {}", context, err)),
            Some(_) => SyncError::query(err, context),
            None => {
                let transport = matches!(
                    err,
                    sqlx::Error::Io(_)
                        | sqlx::Error::Tls(_)
                        | sqlx::Error::PoolTimedOut
                        | sqlx::Error::PoolClosed
                        | sqlx::Error::WorkerCrashed
                        | sqlx::Error::Configuration(_)
                );
                if transport {
                    SyncError::connection(err, context)
                } else {
                    SyncError::query(err, context)
                }
            }
        }
    }
}

#[async_trait]
impl PrimaryStore for MysqlPrimary {
    async fn ensure_schema(&self) -> Result<()> {
        let sql = self.dialect.create_table_sql();
        with_timeout(self.query_timeout, "creating MySQL records table", async {
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| self.classify(e, "creating MySQL records table"))?;
            Ok(())
        })
        .await?;

        info!("MySQL table '{}' created or already exists", self.table);
        Ok(())
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        record.validate()?;

        let sql = self.dialect.insert_sql();
        with_timeout(self.query_timeout, "inserting record", async {
            sqlx::query(&sql)
                .bind(record.primary_key)
                .bind(record.payload.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    let duplicate = e
                        .as_database_error()
                        .is_some_and(|db| db.is_unique_violation());
                    if duplicate {
                        SyncError::DuplicateKey(record.primary_key)
                    } else {
                        self.classify(e, "inserting record")
                    }
                })?;
            Ok(())
        })
        .await?;

        debug!("Stored record {} in MySQL", record.primary_key);
        Ok(())
    }

    async fn list(&self, request: &PageRequest) -> Result<Page> {
        let search = request.search();
        let pattern = search.map(MysqlDialect::like_pattern);
        let escape = LIKE_ESCAPE.to_string();
        let count_sql = self.dialect.count_sql(search);
        let page_sql = self.dialect.select_page_sql(search);

        with_timeout(self.query_timeout, "listing MySQL records", async {
            // Count and page run on the same pooled connection; it returns to
            // the pool when `conn` drops.
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| self.classify(e, "acquiring MySQL connection"))?;

            let mut count_query = sqlx::query(&count_sql);
            if let Some(p) = pattern.as_deref() {
                count_query = count_query.bind(p).bind(&escape).bind(p).bind(&escape);
            }
            let total: i64 = count_query
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| self.classify(e, "counting MySQL records"))?
                .try_get("cnt")
                .map_err(|e| SyncError::query(e, "decoding record count"))?;

            let mut page_query = sqlx::query(&page_sql);
            if let Some(p) = pattern.as_deref() {
                page_query = page_query.bind(p).bind(&escape).bind(p).bind(&escape);
            }
            let rows: Vec<MySqlRow> = page_query
                .bind(request.limit())
                .bind(request.offset())
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| self.classify(e, "fetching MySQL page"))?;

            let items = rows
                .iter()
                .map(Self::row_to_record)
                .collect::<Result<Vec<_>>>()?;

            debug!(
                "MySQL page {} (size {}): {} of {} records",
                request.page(),
                request.page_size(),
                items.len(),
                total
            );
            Ok(Page::new(request, items, total.max(0) as u64))
        })
        .await
    }

    async fn read_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<Record>> {
        let sql = self.dialect.select_after_sql(after.is_some());

        with_timeout(self.query_timeout, "reading MySQL records", async {
            let mut query = sqlx::query(&sql);
            if let Some(pk) = after {
                query = query.bind(pk);
            }
            let rows: Vec<MySqlRow> = query
                .bind(limit as u64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| self.classify(e, "reading MySQL records"))?;

            rows.iter().map(Self::row_to_record).collect()
        })
        .await
    }

    async fn test_connection(&self) -> Result<()> {
        with_timeout(self.query_timeout, "testing MySQL connection", async {
            sqlx::query("SELECT 1")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| SyncError::connection(e, "testing MySQL connection"))?;
            Ok(())
        })
        .await
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
