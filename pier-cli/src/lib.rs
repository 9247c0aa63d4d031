//! # pier-cli
//!
//! Command-line tool for inspecting and maintaining Pier databases.
//!
//! This crate provides the `pier` binary with the following commands:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pier tables` | List tables with their row counts |
//! | `pier schema export [--out <file>]` | Print or save every `CREATE TABLE` statement |
//! | `pier schema import --from <db> [--clear]` | Replay another database's structure |
//! | `pier empty <tables...>` | Delete every row of the given tables |
//! | `pier drop <tables...>` | Drop the given tables |
//! | `pier run <script> [--var k=v]...` | Run a SQL script inside one transaction |
//!
//! Every command connects to `--database` when given, otherwise to the
//! `pier.database` section of the configuration.
//!
//! ## Architecture
//!
//! - [`commands::schema`]: structure export and import (`pier schema`)
//! - [`commands::tables`]: listing, emptying and dropping tables
//! - [`commands::run`]: script runner (`pier run`)

pub mod commands;
