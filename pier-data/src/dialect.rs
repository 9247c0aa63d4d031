//! SQL dialects and literal escaping.
//!
//! Every value that ends up inside generated SQL goes through
//! [`Dialect::escape_value`]; every table or column name through
//! [`Dialect::escape_identifier`].

use crate::error::DataError;
use crate::value::Value;

/// Format used for timestamp literals in every supported dialect.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite: double-quoted identifiers, `''` string escaping.
    Sqlite,
    /// MySQL/MariaDB: backtick identifiers, backslash string escaping.
    MySql,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        }
    }

    pub fn begin_work_sql(self) -> &'static str {
        match self {
            Dialect::MySql => "BEGIN WORK",
            Dialect::Sqlite => "BEGIN",
        }
    }

    pub fn commit_sql(self) -> &'static str {
        "COMMIT"
    }

    pub fn rollback_sql(self) -> &'static str {
        "ROLLBACK"
    }

    /// Statement removing every row of an (already escaped) table.
    pub fn empty_table_sql(self, escaped_table: &str) -> String {
        match self {
            Dialect::MySql => format!("TRUNCATE {escaped_table}"),
            Dialect::Sqlite => format!("DELETE FROM {escaped_table}"),
        }
    }

    /// Escape the name of a table or column: surrounding whitespace is
    /// trimmed, embedded quote characters are doubled, and the result is
    /// wrapped in the dialect's identifier quote.
    pub fn escape_identifier(self, name: &str) -> String {
        let quote = self.quote_char();
        let doubled = format!("{quote}{quote}");
        format!(
            "{quote}{}{quote}",
            name.trim().replace(quote, &doubled)
        )
    }

    /// Escape a string body (without the surrounding quotes).
    ///
    /// SQLite has no escape for NUL inside a literal, so each NUL closes the
    /// literal and is spliced back in with `char(0)`.
    pub fn escape_string(self, raw: &str) -> String {
        match self {
            Dialect::Sqlite => raw.replace('\'', "''").replace('\0', "'||char(0)||'"),
            Dialect::MySql => {
                let mut out = String::with_capacity(raw.len());
                for c in raw.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\x1a' => out.push_str("\\Z"),
                        other => out.push(other),
                    }
                }
                out
            }
        }
    }

    /// Turn a value into an SQL literal.
    ///
    /// `Null` becomes `NULL`, booleans `'1'`/`'0'`, lists a comma-joined list
    /// of their escaped items, timestamps the dialect's timestamp literal,
    /// numbers bare numeric literals and text a quoted, escaped string.
    /// Non-finite floats have no literal form.
    pub fn escape_value(self, value: &Value) -> Result<String, DataError> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(if *b { "'1'" } else { "'0'" }.to_string()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) if f.is_finite() => Ok(f.to_string()),
            Value::Float(f) => Err(DataError::UnsupportedValueType(format!(
                "float {f} has no SQL literal"
            ))),
            Value::Text(s) => Ok(format!("'{}'", self.escape_string(s))),
            Value::Timestamp(ts) => {
                let formatted = ts.format(TIMESTAMP_FORMAT).to_string();
                Ok(match self {
                    Dialect::MySql => format!("TIMESTAMP '{formatted}'"),
                    Dialect::Sqlite => format!("'{formatted}'"),
                })
            }
            Value::List(items) => {
                let escaped = items
                    .iter()
                    .map(|item| self.escape_value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(escaped.join(", "))
            }
        }
    }
}
