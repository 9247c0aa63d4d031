use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::adapter::Row;
use crate::entity::{Column, ColumnType};
use crate::error::DataError;
use crate::value::Value;

/// Typed column values of one entity, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing any previous value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, DataError> {
        match self.value(column) {
            Some(value) => T::from_value(column, value),
            None => T::from_missing(column),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Coerce the fields of `row` that match a declared column into typed
    /// values. Undeclared row fields are ignored.
    pub fn hydrate(row: &Row, columns: &[Column]) -> Result<Self, DataError> {
        let mut record = Record::new();
        for (name, raw) in row.fields() {
            let Some(column) = columns.iter().find(|c| c.name == name) else {
                continue;
            };
            let value = match raw {
                None => Value::Null,
                Some(raw) => coerce(column, raw)?,
            };
            record.fields.push((name.to_string(), value));
        }
        Ok(record)
    }
}

fn coerce(column: &Column, raw: &str) -> Result<Value, DataError> {
    match column.kind {
        ColumnType::String => Ok(Value::Text(raw.to_string())),
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| DataError::decode(column.name, format!("'{raw}' is not an integer: {e}"))),
        ColumnType::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| DataError::decode(column.name, format!("'{raw}' is not a number: {e}"))),
        ColumnType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" | "" => Ok(Value::Bool(false)),
            _ => Err(DataError::decode(
                column.name,
                format!("'{raw}' is not a boolean"),
            )),
        },
        ColumnType::DateTime => parse_datetime(raw.trim())
            .ok_or_else(|| DataError::decode(column.name, format!("'{raw}' is not a date/time"))),
    }
}

/// Accepts `Y-m-d H:M:S` (optionally fractional), RFC 3339 and bare dates.
/// The MySQL zero date reads as `NULL`.
fn parse_datetime(raw: &str) -> Option<Value> {
    if raw.is_empty() || raw.starts_with("0000-00-00") {
        return Some(Value::Null);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Value::Timestamp(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Value::Timestamp(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Value::Timestamp(dt.naive_utc()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(Value::from)
}

/// Conversion out of a typed [`Value`], used by [`Record::get`].
pub trait FromValue: Sized {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError>;

    fn from_missing(column: &str) -> Result<Self, DataError> {
        Err(DataError::decode(column, "column missing from record"))
    }
}

fn mismatch<T>(column: &str, expected: &str, found: &Value) -> Result<T, DataError> {
    Err(DataError::decode(
        column,
        format!("expected {expected}, found {}", found.type_name()),
    ))
}

impl FromValue for Value {
    fn from_value(_column: &str, value: &Value) -> Result<Self, DataError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Integer(i) => Ok(*i),
            other => mismatch(column, "integer", other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        let wide = i64::from_value(column, value)?;
        i32::try_from(wide).map_err(|e| DataError::decode(column, e.to_string()))
    }
}

impl FromValue for u64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        let wide = i64::from_value(column, value)?;
        u64::try_from(wide).map_err(|e| DataError::decode(column, e.to_string()))
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => mismatch(column, "float", other),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => mismatch(column, "boolean", other),
        }
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch(column, "text", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => mismatch(column, "timestamp", other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> Result<Self, DataError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }

    fn from_missing(_column: &str) -> Result<Self, DataError> {
        Ok(None)
    }
}
