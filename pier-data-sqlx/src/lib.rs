//! # pier-data-sqlx: SQLx backend for the Pier data layer
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementation of [`pier_data::Adapter`]. It depends on [`pier-data`] for the
//! abstract traits and types, and adds the SQLite adapter and the error
//! bridging needed to talk to a real database.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqliteAdapter`] | Single-connection adapter over `sqlx::SqliteConnection` |
//! | [`SqlxErrorExt`] | Converts `sqlx::Error` into `DataError` (`.into_query_error(sql)`, ...) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Quick start
//!
//! ```ignore
//! use pier_data::prelude::*;
//! use pier_data_sqlx::SqliteAdapter;
//!
//! let adapter = SqliteAdapter::open(&ConnectionParams::embedded("pier.db")).await?;
//! let registry = RepositoryRegistry::new(adapter);
//! let options = registry.require::<ConfigOption>()?;
//! let all = options.find_all(&QueryArgs::new()).await?;
//! ```

pub mod adapter;
pub mod error;

pub use adapter::{SqliteAdapter, MIN_SQLITE_VERSION};
pub use error::{SqlxErrorExt, SqlxResult};

/// Re-exports of the most commonly used types from both `pier-data` and this crate.
pub mod prelude {
    pub use crate::{SqliteAdapter, SqlxErrorExt};
    pub use pier_data::prelude::*;
}
