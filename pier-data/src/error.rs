/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// Connect-time failure. The adapter that produced it holds no handle and
    /// must not be reused until it connects successfully.
    Connection(String),
    /// A statement failed. Carries the backend state code when available.
    Query {
        sqlstate: Option<String>,
        message: String,
        sql: String,
    },
    /// `begin_work`/`commit`/`rollback` called in the wrong order.
    TransactionState(String),
    /// Malformed query arguments, entity schema or pagination request.
    InvalidArgument(String),
    /// A value that has no SQL literal form.
    UnsupportedValueType(String),
    /// The repository construction breaker for an entity type has tripped.
    BootstrapExhausted { entity: &'static str, attempts: u64 },
    /// A column value could not be coerced to its declared logical type.
    Decode { column: String, message: String },
    NotFound(String),
    /// A bulk script stopped part way; the enclosing transaction was rolled back.
    Script {
        total: usize,
        executed: usize,
        source: Box<DataError>,
    },
    /// Opaque driver error with no statement attached.
    Database(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `pier-data-sqlx`) to wrap driver-specific
    /// errors that are not tied to a statement.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn query(sql: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::Query {
            sqlstate: None,
            message: message.into(),
            sql: sql.into(),
        }
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// The failing SQL for `Query` errors, looking through `Script` wrappers.
    pub fn sql(&self) -> Option<&str> {
        match self {
            DataError::Query { sql, .. } => Some(sql),
            DataError::Script { source, .. } => source.sql(),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Connection(msg) => write!(f, "Connection error: {msg}"),
            DataError::Query {
                sqlstate,
                message,
                sql,
            } => match sqlstate {
                Some(code) => write!(f, "Query error [{code}]: {message} (SQL: {sql})"),
                None => write!(f, "Query error: {message} (SQL: {sql})"),
            },
            DataError::TransactionState(msg) => write!(f, "Transaction state error: {msg}"),
            DataError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            DataError::UnsupportedValueType(msg) => write!(f, "Unsupported value type: {msg}"),
            DataError::BootstrapExhausted { entity, attempts } => write!(
                f,
                "Repository bootstrap exhausted for {entity} after {attempts} attempt(s)"
            ),
            DataError::Decode { column, message } => {
                write!(f, "Cannot decode column '{column}': {message}")
            }
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Script {
                total,
                executed,
                source,
            } => write!(
                f,
                "Script failed after {executed} of {total} queries: {source}"
            ),
            DataError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(&**err),
            DataError::Script { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<pier_core::ConfigError> for DataError {
    fn from(err: pier_core::ConfigError) -> Self {
        DataError::InvalidArgument(err.to_string())
    }
}
