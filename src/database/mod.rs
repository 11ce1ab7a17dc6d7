//! Thin SQLite and MySQL connection wrappers.
//!
//! Both backends share one shape: a serde-friendly config record, a `connect`
//! step that fills in blank settings and opens the handle, passthrough
//! `exec`/`query`/`query_row`, column introspection, and `query_records`,
//! which scans every result row into a [`Record`]. The [`Database`] trait
//! exposes the backend-neutral part of that shape.
//!
//! # Value coercion
//!
//! - SQLite returns each cell in its storage class (integer, real, text, blob,
//!   null). Integers in `BOOL`/`BOOLEAN` columns become booleans.
//! - MySQL renders each cell to its textual form first and then re-types it
//!   by the column's declared type, see [`mysql::classify`].

mod columns;
mod escape;
mod identifier;
pub mod mysql;
pub mod sqlite;

pub use columns::{ColumnDef, ColumnInfo};
pub use escape::{escape_apostrophes, escape_double_quotes, escape_mysql_string};
pub use identifier::{check_database_name, check_table_name};
pub use mysql::{MySqlConfig, MySqlDb};
pub use sqlite::{SqliteConfig, SqliteDb};

use async_trait::async_trait;

use crate::error::Result;
use crate::value::{Record, Value};

/// Backend-neutral operations shared by [`SqliteDb`] and [`MySqlDb`].
///
/// Backend-specific passthroughs (raw rows, prepared statements, driver
/// results) stay on the concrete types.
#[async_trait]
pub trait Database: Send + Sync {
    /// Name of the backend for diagnostics.
    fn backend_name(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// Run a statement, returning the number of affected rows.
    async fn exec(&self, query: &str, args: &[Value]) -> Result<u64>;

    /// Run a query and scan every row. No matching rows is an empty `Vec`.
    async fn query_records(&self, query: &str, args: &[Value]) -> Result<Vec<Record>>;

    /// Column metadata from the system catalog.
    async fn get_sql_table_info(&self, table: &str) -> Result<ColumnInfo>;

    /// Column metadata from a prepared `SELECT * ... LIMIT 1`.
    async fn get_table_info(&self, table: &str) -> Result<ColumnInfo>;

    /// Close the handle. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
