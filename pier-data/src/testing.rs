//! In-crate test doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::{Adapter, ConnectionParams, ResultSet, Row};
use crate::dialect::Dialect;
use crate::entity::{Column, ColumnType, Entity};
use crate::error::DataError;
use crate::record::Record;

/// Adapter that records every statement and answers from a script of
/// queued results (an empty result set once the queue runs dry).
#[derive(Default)]
pub struct StubAdapter {
    pub statements: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<ResultSet, DataError>>>,
    in_tx: AtomicBool,
}

impl StubAdapter {
    pub fn respond(&self, response: Result<ResultSet, DataError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn respond_rows(&self, rows: &[&[(&str, Option<&str>)]]) {
        let rows = rows.iter().map(|fields| row(fields)).collect();
        self.respond(Ok(ResultSet::new(rows, 0, None)));
    }

    pub fn respond_affected(&self, affected: u64, last_insert_id: Option<i64>) {
        self.respond(Ok(ResultSet::new(Vec::new(), affected, last_insert_id)));
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

pub fn row(fields: &[(&str, Option<&str>)]) -> Row {
    Row::new(
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect(),
    )
}

#[async_trait]
impl Adapter for StubAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn connect(&self, _params: &ConnectionParams) -> Result<(), DataError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DataError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }

    fn database_name(&self) -> Option<String> {
        Some("stub".into())
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultSet, DataError> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSet::default()))
    }

    async fn begin_work(&self) -> Result<(), DataError> {
        if self.in_tx.swap(true, Ordering::SeqCst) {
            return Err(DataError::TransactionState("already in a transaction".into()));
        }
        self.statements.lock().unwrap().push("BEGIN".into());
        Ok(())
    }

    async fn commit(&self) -> Result<(), DataError> {
        if !self.in_tx.swap(false, Ordering::SeqCst) {
            return Err(DataError::TransactionState("no transaction".into()));
        }
        self.statements.lock().unwrap().push("COMMIT".into());
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DataError> {
        if !self.in_tx.swap(false, Ordering::SeqCst) {
            return Err(DataError::TransactionState("no transaction".into()));
        }
        self.statements.lock().unwrap().push("ROLLBACK".into());
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx.load(Ordering::SeqCst)
    }

    fn affected_rows(&self) -> u64 {
        0
    }

    fn last_insert_id(&self) -> Option<i64> {
        None
    }

    fn last_error(&self) -> Option<String> {
        None
    }

    fn last_error_code(&self) -> Option<String> {
        None
    }

    async fn list_tables(&self) -> Result<Vec<String>, DataError> {
        Ok(vec!["config_options".into()])
    }

    async fn export_table_structure(&self, _table: &str) -> Result<Option<String>, DataError> {
        Ok(None)
    }
}

const OPTION_COLUMNS: &[Column] = &[
    Column::new("id", ColumnType::Integer),
    Column::new("name", ColumnType::String),
    Column::new("value", ColumnType::String),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    pub id: Option<i64>,
    pub name: String,
    pub value: Option<String>,
    pub new: bool,
}

impl ConfigOption {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            id: None,
            name: name.into(),
            value: Some(value.into()),
            new: true,
        }
    }
}

impl Entity for ConfigOption {
    fn entity_name() -> &'static str {
        "ConfigOption"
    }

    fn table_name() -> &'static str {
        "config_options"
    }

    fn columns() -> &'static [Column] {
        OPTION_COLUMNS
    }

    fn pk_columns() -> &'static [&'static str] {
        &["id"]
    }

    fn auto_increment_column() -> Option<&'static str> {
        Some("id")
    }

    fn from_record(record: &Record) -> Result<Self, DataError> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            value: record.get("value")?,
            new: false,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", &self.name)
            .with("value", self.value.clone())
    }

    fn is_new(&self) -> bool {
        self.new
    }

    fn set_new(&mut self, new: bool) {
        self.new = new;
    }
}
