//! # pier-data
//!
//! Backend-agnostic data access: the [`Adapter`] connection contract, value
//! escaping per [`Dialect`], the query-argument compiler, [`Entity`]
//! hydration, [`DataManager`] repositories with pagination, and the
//! [`RepositoryRegistry`] that hands out one manager per entity type.
//!
//! Concrete backends live in their own crates (`pier-data-sqlx`).

pub mod adapter;
pub mod crud;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod guard;
pub mod page;
pub mod query;
pub mod record;
pub mod registry;
pub mod repository;
pub mod script;
pub mod value;

#[cfg(test)]
mod testing;

pub use adapter::{Adapter, ConnectionParams, ResultSet, Row};
pub use crud::DataManager;
pub use dialect::Dialect;
pub use entity::{Column, ColumnType, Entity, Key};
pub use error::DataError;
pub use guard::{GuardConfig, GuardSnapshot};
pub use page::{Page, Pagination};
pub use query::{Condition, Conditions, Direction, Operator, Order, QueryArgs};
pub use record::{FromValue, Record};
pub use registry::RepositoryRegistry;
pub use repository::{Found, Repository};
pub use script::{run_script, Script, ScriptReport};
pub use value::Value;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        Column, ColumnType, Conditions, DataError, DataManager, Direction, Entity, Key, Page,
        QueryArgs, Record, Repository, RepositoryRegistry, Value,
    };
}
