use crate::error::DataError;
use crate::record::Record;
use crate::value::Value;

/// Logical type of a column; drives how raw row text is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// A persisted domain object with a compile-time table schema.
///
/// # Example
///
/// ```ignore
/// const COLUMNS: &[Column] = &[
///     Column::new("id", ColumnType::Integer),
///     Column::new("name", ColumnType::String),
///     Column::new("value", ColumnType::String),
/// ];
///
/// impl Entity for ConfigOption {
///     fn entity_name() -> &'static str { "ConfigOption" }
///     fn table_name() -> &'static str { "config_options" }
///     fn columns() -> &'static [Column] { COLUMNS }
///     fn pk_columns() -> &'static [&'static str] { &["id"] }
///     fn auto_increment_column() -> Option<&'static str> { Some("id") }
///     fn from_record(r: &Record) -> Result<Self, DataError> {
///         Ok(Self { id: r.get("id")?, name: r.get("name")?, value: r.get("value")?, new: false })
///     }
///     fn to_record(&self) -> Record {
///         Record::new().with("id", self.id).with("name", &self.name).with("value", &self.value)
///     }
///     fn is_new(&self) -> bool { self.new }
///     fn set_new(&mut self, new: bool) { self.new = new }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name used in logs and diagnostics.
    fn entity_name() -> &'static str;
    fn table_name() -> &'static str;
    fn columns() -> &'static [Column];
    fn pk_columns() -> &'static [&'static str];

    fn auto_increment_column() -> Option<&'static str> {
        None
    }

    fn from_record(record: &Record) -> Result<Self, DataError>;
    fn to_record(&self) -> Record;

    /// `true` until the entity has been inserted or loaded from storage.
    fn is_new(&self) -> bool;
    fn set_new(&mut self, new: bool);

    /// Primary key values, in `pk_columns` order.
    fn key(&self) -> Key {
        let record = self.to_record();
        Key(Self::pk_columns()
            .iter()
            .map(|column| record.value(column).cloned().unwrap_or(Value::Null))
            .collect())
    }

    fn column(name: &str) -> Option<&'static Column> {
        Self::columns().iter().find(|c| c.name == name)
    }
}

/// A primary key, single or composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Key(pub Vec<Value>);

impl Key {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Stable string form used by identity caches.
    pub fn cache_key(&self) -> String {
        format!("{:?}", self.0)
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key(vec![v])
    }
}

impl From<Vec<Value>> for Key {
    fn from(v: Vec<Value>) -> Self {
        Key(v)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key(vec![Value::Integer(v)])
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key(vec![Value::from(v)])
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key(vec![Value::Text(v)])
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key(vec![a.into(), b.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_keep_order() {
        let key = Key::from(("plugin", 3));
        assert_eq!(key.values(), &[Value::from("plugin"), Value::Integer(3)]);
        assert_ne!(key.cache_key(), Key::from((3, "plugin")).cache_key());
    }

    #[test]
    fn integer_and_text_keys_differ() {
        assert_ne!(Key::from(1i64).cache_key(), Key::from("1").cache_key());
    }
}
