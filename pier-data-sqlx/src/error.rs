use pier_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Instead, use `.into_data_error()` or one of the
/// context-carrying variants below.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;

    /// A failed statement, keeping the backend error code and the SQL text.
    fn into_query_error(self, sql: &str) -> DataError;

    /// A failure while opening or closing the connection.
    fn into_connection_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            _ => DataError::database(self),
        }
    }

    fn into_query_error(self, sql: &str) -> DataError {
        match &self {
            sqlx::Error::Database(db) => DataError::Query {
                sqlstate: db.code().map(|code| code.into_owned()),
                message: db.message().to_string(),
                sql: sql.to_string(),
            },
            _ => DataError::Query {
                sqlstate: None,
                message: self.to_string(),
                sql: sql.to_string(),
            },
        }
    }

    fn into_connection_error(self) -> DataError {
        DataError::Connection(self.to_string())
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;
