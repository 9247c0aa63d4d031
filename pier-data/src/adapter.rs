use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use pier_core::{ConfigError, ConfigProperties, PierConfig};

use crate::dialect::Dialect;
use crate::error::DataError;
use crate::value::Value;

/// Connection parameters, read from the `pier.database` config section.
///
/// ```yaml
/// pier:
///   database:
///     host: localhost
///     user: pier
///     pass: "${DB_PASSWORD}"
///     name: projectpier
///     persist: false
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub name: String,
    pub persist: bool,
}

impl ConnectionParams {
    /// Parameters for a file-backed (or `:memory:`) embedded database.
    pub fn embedded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"***")
            .field("name", &self.name)
            .field("persist", &self.persist)
            .finish()
    }
}

impl ConfigProperties for ConnectionParams {
    fn prefix() -> &'static str {
        "pier.database"
    }

    fn from_config(config: &PierConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            host: config.get_or(&Self::key("host"), String::new())?,
            user: config.get_or(&Self::key("user"), String::new())?,
            pass: config.get_or(&Self::key("pass"), String::new())?,
            name: config.get(&Self::key("name"))?,
            persist: config.get_or(&Self::key("persist"), false)?,
        })
    }
}

/// One result row: column names in select order, `None` for SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Option<String>)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Option<String>)>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.push((column.into(), value));
    }

    /// Raw text of a column. `None` when the column is absent or `NULL`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Buffered result of one statement.
///
/// Rows are handed out with [`fetch_row`](Self::fetch_row) until it returns
/// `None`. [`release`](Self::release) drops the remaining rows and may be
/// called any number of times.
#[derive(Debug, Default)]
pub struct ResultSet {
    rows: VecDeque<Row>,
    row_count: usize,
    affected_rows: u64,
    last_insert_id: Option<i64>,
    released: bool,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>, affected_rows: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            row_count: rows.len(),
            rows: rows.into(),
            affected_rows,
            last_insert_id,
            released: false,
        }
    }

    pub fn fetch_row(&mut self) -> Option<Row> {
        if self.released {
            return None;
        }
        self.rows.pop_front()
    }

    /// Number of rows the statement produced.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    pub fn release(&mut self) {
        self.rows.clear();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Remaining (unfetched) rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows.into()
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetch_row()
    }
}

/// Connection-level contract every database backend implements.
///
/// An adapter owns at most one live connection and serializes the
/// statements issued through it. Transactions do not nest.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Open the connection. A previous handle is released first; on failure
    /// no handle is kept.
    async fn connect(&self, params: &ConnectionParams) -> Result<(), DataError>;

    async fn disconnect(&self) -> Result<(), DataError>;

    async fn is_connected(&self) -> bool;

    /// Name of the database the adapter is connected to.
    fn database_name(&self) -> Option<String>;

    async fn execute_query(&self, sql: &str) -> Result<ResultSet, DataError>;

    /// Execute a statement and return the number of affected rows.
    async fn execute(&self, sql: &str) -> Result<u64, DataError> {
        Ok(self.execute_query(sql).await?.affected_rows())
    }

    async fn execute_all(&self, sql: &str) -> Result<Vec<Row>, DataError> {
        Ok(self.execute_query(sql).await?.into_rows())
    }

    async fn execute_one(&self, sql: &str) -> Result<Option<Row>, DataError> {
        let mut result = self.execute_query(sql).await?;
        let row = result.fetch_row();
        result.release();
        Ok(row)
    }

    async fn begin_work(&self) -> Result<(), DataError>;
    async fn commit(&self) -> Result<(), DataError>;
    async fn rollback(&self) -> Result<(), DataError>;
    fn in_transaction(&self) -> bool;

    fn escape_identifier(&self, name: &str) -> String {
        self.dialect().escape_identifier(name)
    }

    fn escape_value(&self, value: &Value) -> Result<String, DataError> {
        self.dialect().escape_value(value)
    }

    /// Rows affected by the last statement.
    fn affected_rows(&self) -> u64;
    fn last_insert_id(&self) -> Option<i64>;
    fn last_error(&self) -> Option<String>;
    fn last_error_code(&self) -> Option<String>;

    async fn list_tables(&self) -> Result<Vec<String>, DataError>;

    /// `CREATE TABLE` statement of one table, `None` if it does not exist.
    async fn export_table_structure(&self, table: &str) -> Result<Option<String>, DataError>;

    async fn export_database_structure(&self) -> Result<BTreeMap<String, String>, DataError> {
        let mut structure = BTreeMap::new();
        for table in self.list_tables().await? {
            if let Some(ddl) = self.export_table_structure(&table).await? {
                structure.insert(table, ddl);
            }
        }
        Ok(structure)
    }

    /// Replay the structure of `from` on this database.
    async fn import_database_structure(
        &self,
        from: &dyn Adapter,
        clear: bool,
    ) -> Result<usize, DataError> {
        let structure = from.export_database_structure().await?;
        if clear {
            self.clear_database().await?;
        }
        for ddl in structure.values() {
            self.execute(ddl).await?;
        }
        tracing::info!(tables = structure.len(), "Imported database structure");
        Ok(structure.len())
    }

    /// Drop every table of the database.
    async fn clear_database(&self) -> Result<(), DataError> {
        let tables = self.list_tables().await?;
        self.drop_tables(&tables).await
    }

    async fn drop_tables(&self, tables: &[String]) -> Result<(), DataError> {
        for table in tables {
            let sql = format!("DROP TABLE IF EXISTS {}", self.escape_identifier(table));
            self.execute(&sql).await?;
        }
        Ok(())
    }

    async fn empty_tables(&self, tables: &[String]) -> Result<(), DataError> {
        for table in tables {
            let sql = self
                .dialect()
                .empty_table_sql(&self.escape_identifier(table));
            self.execute(&sql).await?;
        }
        Ok(())
    }
}
