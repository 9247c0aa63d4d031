//! Command implementations for the `pier` CLI.
//!
//! Each submodule corresponds to a top-level CLI command. Commands take an
//! already connected adapter; [`connect`] resolves which database to open.

use std::sync::Arc;

use pier_core::PierConfig;
use pier_data::ConnectionParams;
use pier_data_sqlx::SqliteAdapter;

/// Script runner: `pier run <script>`.
///
/// Substitutes `--var name=value` placeholders and executes the script in
/// a single transaction.
pub mod run;

/// Structure export and import: `pier schema`.
pub mod schema;

/// Table maintenance: `pier tables`, `pier empty`, `pier drop`.
pub mod tables;

/// Open the database named by `--database`, or the one configured under
/// `pier.database`.
pub async fn connect(
    database: Option<&str>,
    config: &PierConfig,
) -> Result<Arc<SqliteAdapter>, Box<dyn std::error::Error>> {
    let params = match database {
        Some(name) => ConnectionParams::embedded(name),
        None => config.section::<ConnectionParams>().map_err(|_| {
            "No database given. Pass --database or set pier.database.name in pier.yaml"
        })?,
    };
    tracing::debug!(database = %params.name, "Opening database");
    Ok(SqliteAdapter::open(&params).await?)
}

/// Tables named on the command line that the database does not have.
pub(crate) fn unknown_tables(requested: &[String], existing: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|table| !existing.contains(table))
        .cloned()
        .collect()
}
