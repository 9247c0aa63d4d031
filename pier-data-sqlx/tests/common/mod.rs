#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDateTime;
use pier_data::prelude::*;
use pier_data::Adapter;
use pier_data_sqlx::SqliteAdapter;

pub const SCHEMA: &str = "\
CREATE TABLE config_options (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_name TEXT NOT NULL DEFAULT 'general',
    name TEXT NOT NULL UNIQUE,
    value TEXT,
    is_system INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE plugins (
    name TEXT PRIMARY KEY,
    version INTEGER NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 0,
    installed_on TEXT
);";

pub async fn adapter() -> Arc<SqliteAdapter> {
    let adapter = SqliteAdapter::in_memory().await.unwrap();
    adapter.execute(SCHEMA).await.unwrap();
    adapter
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    pub id: Option<i64>,
    pub category_name: String,
    pub name: String,
    pub value: Option<String>,
    pub is_system: bool,
    pub new: bool,
}

impl ConfigOption {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            id: None,
            category_name: "general".into(),
            name: name.into(),
            value: Some(value.into()),
            is_system: false,
            new: true,
        }
    }
}

const CONFIG_OPTION_COLUMNS: &[Column] = &[
    Column::new("id", ColumnType::Integer),
    Column::new("category_name", ColumnType::String),
    Column::new("name", ColumnType::String),
    Column::new("value", ColumnType::String),
    Column::new("is_system", ColumnType::Boolean),
];

impl Entity for ConfigOption {
    fn entity_name() -> &'static str {
        "ConfigOption"
    }

    fn table_name() -> &'static str {
        "config_options"
    }

    fn columns() -> &'static [Column] {
        CONFIG_OPTION_COLUMNS
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
            category_name: record.get("category_name")?,
            name: record.get("name")?,
            value: record.get("value")?,
            is_system: record.get("is_system")?,
            new: false,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("category_name", &self.category_name)
            .with("name", &self.name)
            .with("value", self.value.clone())
            .with("is_system", self.is_system)
    }

    fn is_new(&self) -> bool {
        self.new
    }

    fn set_new(&mut self, new: bool) {
        self.new = new;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub version: i64,
    pub is_enabled: bool,
    pub installed_on: Option<NaiveDateTime>,
    pub new: bool,
}

impl Plugin {
    pub fn new(name: &str, version: i64) -> Self {
        Self {
            name: name.into(),
            version,
            is_enabled: false,
            installed_on: None,
            new: true,
        }
    }
}

const PLUGIN_COLUMNS: &[Column] = &[
    Column::new("name", ColumnType::String),
    Column::new("version", ColumnType::Integer),
    Column::new("is_enabled", ColumnType::Boolean),
    Column::new("installed_on", ColumnType::DateTime),
];

impl Entity for Plugin {
    fn entity_name() -> &'static str {
        "Plugin"
    }

    fn table_name() -> &'static str {
        "plugins"
    }

    fn columns() -> &'static [Column] {
        PLUGIN_COLUMNS
    }

    fn pk_columns() -> &'static [&'static str] {
        &["name"]
    }

    fn from_record(record: &Record) -> Result<Self, DataError> {
        Ok(Self {
            name: record.get("name")?,
            version: record.get("version")?,
            is_enabled: record.get("is_enabled")?,
            installed_on: record.get("installed_on")?,
            new: false,
        })
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("name", &self.name)
            .with("version", self.version)
            .with("is_enabled", self.is_enabled)
            .with("installed_on", self.installed_on)
    }

    fn is_new(&self) -> bool {
        self.new
    }

    fn set_new(&mut self, new: bool) {
        self.new = new;
    }
}
