use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::TryStreamExt;
use pier_core::PierConfig;
use pier_data::{Adapter, ConnectionParams, DataError, Dialect, ResultSet, Row};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as _, Connection, Either, Executor, Row as _, ValueRef};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::SqlxErrorExt;

/// Oldest SQLite release the adapter accepts.
pub const MIN_SQLITE_VERSION: (u32, u32, u32) = (3, 8, 3);

#[derive(Debug, Default)]
struct Stats {
    affected_rows: u64,
    last_insert_id: Option<i64>,
    last_error: Option<String>,
    last_error_code: Option<String>,
}

/// [`Adapter`] over a single SQLx SQLite connection.
///
/// `ConnectionParams::name` is the database file (created when missing) or
/// `:memory:`. Statements are serialized through an async mutex, so calls
/// complete in the order they acquire the connection.
///
/// # Example
///
/// ```ignore
/// let adapter = SqliteAdapter::open(&ConnectionParams::embedded("pier.db")).await?;
/// let options = DataManager::<ConfigOption>::new(adapter.clone())?;
/// ```
#[derive(Debug, Default)]
pub struct SqliteAdapter {
    link: AsyncMutex<Option<SqliteConnection>>,
    database: Mutex<Option<String>>,
    in_tx: AtomicBool,
    stats: Mutex<Stats>,
}

impl SqliteAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and connect an adapter.
    pub async fn open(params: &ConnectionParams) -> Result<Arc<Self>, DataError> {
        let adapter = Arc::new(Self::new());
        adapter.connect(params).await?;
        Ok(adapter)
    }

    pub async fn in_memory() -> Result<Arc<Self>, DataError> {
        Self::open(&ConnectionParams::embedded(":memory:")).await
    }

    /// Connect using the `pier.database` config section.
    pub async fn from_config(config: &PierConfig) -> Result<Arc<Self>, DataError> {
        let params: ConnectionParams = config.section()?;
        Self::open(&params).await
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, Stats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_success(&self, affected_rows: u64, last_insert_id: Option<i64>) {
        let mut stats = self.stats();
        stats.affected_rows = affected_rows;
        if last_insert_id.is_some() {
            stats.last_insert_id = last_insert_id;
        }
        stats.last_error = None;
        stats.last_error_code = None;
    }

    fn record_failure(&self, err: DataError) -> DataError {
        let mut stats = self.stats();
        stats.affected_rows = 0;
        match &err {
            DataError::Query {
                sqlstate, message, ..
            } => {
                stats.last_error = Some(message.clone());
                stats.last_error_code = sqlstate.clone();
            }
            other => {
                stats.last_error = Some(other.to_string());
                stats.last_error_code = None;
            }
        }
        err
    }

    async fn run(&self, sql: &str) -> Result<ResultSet, DataError> {
        let mut link = self.link.lock().await;
        let conn = link
            .as_mut()
            .ok_or_else(|| DataError::Connection("adapter is not connected".into()))?;
        tracing::debug!(sql, "Executing query");

        let mut rows = Vec::new();
        let mut affected_rows = 0u64;
        let mut last_insert_id = None;
        let mut stream = conn.fetch_many(sqlx::raw_sql(sql));
        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|e| e.into_query_error(sql))?
        {
            match item {
                Either::Left(done) => {
                    affected_rows += done.rows_affected();
                    let id = done.last_insert_rowid();
                    if id != 0 {
                        last_insert_id = Some(id);
                    }
                }
                Either::Right(row) => rows.push(decode_row(&row)?),
            }
        }
        Ok(ResultSet::new(rows, affected_rows, last_insert_id))
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, DataError> {
    let mut decoded = Row::default();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(index)
            .map_err(|e| DataError::decode(column.name(), e.to_string()))?;
        let value = if raw.is_null() {
            None
        } else {
            Some(
                row.try_get_unchecked::<String, _>(index)
                    .map_err(|e| DataError::decode(column.name(), e.to_string()))?,
            )
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

#[async_trait]
impl Adapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn connect(&self, params: &ConnectionParams) -> Result<(), DataError> {
        let mut link = self.link.lock().await;
        if let Some(previous) = link.take() {
            if let Err(err) = previous.close().await {
                tracing::warn!(error = %err, "Closing previous connection failed");
            }
        }
        self.in_tx.store(false, Ordering::SeqCst);
        *self.database.lock().unwrap_or_else(PoisonError::into_inner) = None;

        let options = if params.name.is_empty() || params.name == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| e.into_connection_error())?
        } else {
            SqliteConnectOptions::new()
                .filename(&params.name)
                .create_if_missing(true)
        };
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| e.into_connection_error())?;

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&mut conn)
            .await
            .map_err(|e| e.into_connection_error())?;
        let supported = parse_version(&version).is_some_and(|v| v >= MIN_SQLITE_VERSION);
        if !supported {
            let _ = conn.close().await;
            let (major, minor, patch) = MIN_SQLITE_VERSION;
            return Err(DataError::Connection(format!(
                "SQLite {version} is too old, {major}.{minor}.{patch} or newer is required"
            )));
        }

        if params.persist {
            tracing::debug!("Persistent connections have no effect for SQLite");
        }
        *link = Some(conn);
        *self.database.lock().unwrap_or_else(PoisonError::into_inner) = Some(params.name.clone());
        tracing::info!(database = %params.name, %version, "Connected to SQLite");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DataError> {
        let mut link = self.link.lock().await;
        self.in_tx.store(false, Ordering::SeqCst);
        *self.database.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(conn) = link.take() {
            conn.close().await.map_err(|e| e.into_connection_error())?;
            tracing::info!("Disconnected from SQLite");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.link.lock().await.is_some()
    }

    fn database_name(&self) -> Option<String> {
        self.database
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultSet, DataError> {
        match self.run(sql).await {
            Ok(result) => {
                self.record_success(result.affected_rows(), result.last_insert_id());
                Ok(result)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    async fn begin_work(&self) -> Result<(), DataError> {
        if self.in_tx.load(Ordering::SeqCst) {
            return Err(DataError::TransactionState(
                "a transaction is already open".into(),
            ));
        }
        self.execute_query(self.dialect().begin_work_sql()).await?;
        self.in_tx.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DataError> {
        if !self.in_tx.load(Ordering::SeqCst) {
            return Err(DataError::TransactionState("no open transaction to commit".into()));
        }
        self.execute_query(self.dialect().commit_sql()).await?;
        self.in_tx.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DataError> {
        if !self.in_tx.load(Ordering::SeqCst) {
            return Err(DataError::TransactionState(
                "no open transaction to roll back".into(),
            ));
        }
        let result = self.execute_query(self.dialect().rollback_sql()).await;
        self.in_tx.store(false, Ordering::SeqCst);
        result.map(|_| ())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx.load(Ordering::SeqCst)
    }

    fn affected_rows(&self) -> u64 {
        self.stats().affected_rows
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.stats().last_insert_id
    }

    fn last_error(&self) -> Option<String> {
        self.stats().last_error.clone()
    }

    fn last_error_code(&self) -> Option<String> {
        self.stats().last_error_code.clone()
    }

    async fn list_tables(&self) -> Result<Vec<String>, DataError> {
        let rows = self
            .execute_all(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("name").map(str::to_string))
            .collect())
    }

    async fn export_table_structure(&self, table: &str) -> Result<Option<String>, DataError> {
        let sql = format!(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = {}",
            self.escape_value(&table.into())?
        );
        Ok(self
            .execute_one(&sql)
            .await?
            .and_then(|row| row.get("sql").map(str::to_string)))
    }
}
