//! SQLite wrapper over `rusqlite`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Row, Rows, Statement};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ColumnInfo, Database};
use crate::error::{Error, Result};
use crate::file::{file_path_exists, file_path_join, filename, filename_base, filename_ext};
use crate::value::{Record, Value};

/// Extension used when neither the config nor the name supplies one.
pub const DEFAULT_EXTENSION: &str = "db";

/// SQLite connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Directory holding the database when `database` is set, otherwise the
    /// full path of the database file
    pub file_path: String,
    /// Logical database name, optionally with an extension (`app.sqlite`)
    pub database: String,
    /// Explicit file extension, without the dot
    pub database_ext: String,
    /// Create the file when it does not exist yet
    pub auto_create: bool,
}

impl SqliteConfig {
    /// Config for an existing database file
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Config for a named database inside `dir`
    pub fn named(dir: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            file_path: dir.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.database_ext = ext.into();
        self
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Fill in the blank fields.
    ///
    /// With a database name, `file_path` becomes `<dir>/<name>.<ext>` where
    /// `dir` defaults to the working directory. Without one, `file_path` is
    /// required and the name and extension are taken from it.
    pub fn normalize(&mut self) -> Result<()> {
        if !self.database.is_empty() {
            if !self.database_ext.is_empty()
                && filename(&self.file_path) == format!("{}.{}", self.database, self.database_ext)
            {
                // already resolved by an earlier connect
                return Ok(());
            }
            self.split_database_name();
            let file = format!("{}.{}", self.database, self.database_ext);
            let dir = if self.file_path.is_empty() {
                std::env::current_dir()
                    .map_err(|e| Error::InvalidState(format!("working directory unavailable: {e}")))?
                    .to_string_lossy()
                    .into_owned()
            } else {
                self.file_path.clone()
            };
            self.file_path = file_path_join(&dir, &file);
        } else {
            if self.file_path.is_empty() {
                return Err(Error::InvalidState(
                    "no database name or file path given".to_string(),
                ));
            }
            self.database = filename(&self.file_path);
            if !self.database.is_empty() {
                self.split_database_name();
            }
        }
        Ok(())
    }

    fn split_database_name(&mut self) {
        if self.database_ext.is_empty() {
            self.database_ext = filename_ext(&self.database);
        }
        if !self.database_ext.is_empty() {
            self.database = filename_base(&self.database);
        } else {
            self.database_ext = DEFAULT_EXTENSION.to_string();
        }
    }
}

/// SQLite database handle plus the config it was opened with
#[derive(Debug, Default)]
pub struct SqliteDb {
    config: SqliteConfig,
    connection: Option<Mutex<Connection>>,
}

impl SqliteDb {
    /// Create an unconnected wrapper
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Create and connect in one step
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let mut db = Self::new(config);
        db.connect()?;
        Ok(db)
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SqliteConfig {
        &mut self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Normalize the config and open the database file.
    ///
    /// Connecting again replaces the current handle.
    pub fn connect(&mut self) -> Result<()> {
        self.config.normalize()?;
        let path = &self.config.file_path;

        if !self.config.auto_create && !file_path_exists(path) {
            return Err(Error::NotFound(format!("database file {path:?} does not exist")));
        }

        debug!(
            path = %path,
            database = %self.config.database,
            ext = %self.config.database_ext,
            "opening sqlite database"
        );
        self.connection = Some(Mutex::new(Connection::open(path)?));
        Ok(())
    }

    /// Close the handle; the wrapper is disconnected even if closing fails.
    pub fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            let connection = connection.into_inner().unwrap_or_else(PoisonError::into_inner);
            connection.close().map_err(|(_, e)| e)?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        Ok(connection.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run `f` against the raw connection, e.g. to hold a cursor open.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.conn()?;
        Ok(f(&conn)?)
    }

    /// Execute a statement, returning the number of changed rows.
    pub fn exec(&self, query: &str, args: &[Value]) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(query.trim(), params_from_iter(args.iter()))?)
    }

    /// Run a query and map every row with `f`.
    pub fn query<T, F>(&self, query: &str, args: &[Value], f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(query.trim())?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), f)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(items)
    }

    /// Run a query expected to return one row and map it with `f`.
    pub fn query_row<T, F>(&self, query: &str, args: &[Value], f: F) -> Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        Ok(conn.query_row(query.trim(), params_from_iter(args.iter()), f)?)
    }

    /// Column metadata from `PRAGMA_TABLE_INFO`, in table order.
    pub fn get_sql_table_info(&self, table: &str) -> Result<ColumnInfo> {
        let conn = self.conn()?;
        if table.is_empty() {
            return Err(Error::InvalidArgument("table cannot be blank".to_string()));
        }
        debug!(table, "reading column catalog");

        let mut stmt = conn.prepare(
            "SELECT IFNULL(cid, 0) + 1, IFNULL(name, ''), IFNULL(type, '') FROM PRAGMA_TABLE_INFO(?)",
        )?;
        let mut rows = stmt.query([table])?;
        let mut info = ColumnInfo::new();
        while let Some(row) = rows.next()? {
            let sequence: i64 = row.get(0)?;
            info.push(sequence as usize, row.get::<_, String>(1)?, row.get::<_, String>(2)?);
        }
        Ok(info)
    }

    /// Column metadata from a prepared `SELECT * FROM <table> LIMIT 1`.
    ///
    /// Works for empty tables: the statement is prepared, never stepped.
    pub fn get_table_info(&self, table: &str) -> Result<ColumnInfo> {
        let conn = self.conn()?;
        if table.is_empty() {
            return Err(Error::InvalidArgument("table cannot be blank".to_string()));
        }

        let stmt = conn.prepare(&format!("SELECT * FROM {table} LIMIT 1;"))?;
        Ok(Self::get_rows_info(&stmt))
    }

    /// Column metadata from a prepared statement. Declared types are
    /// uppercased; expression columns have an empty type.
    pub fn get_rows_info(stmt: &Statement<'_>) -> ColumnInfo {
        ColumnInfo::from_ordered(stmt.columns().iter().map(|column| {
            (
                column.name().to_string(),
                column.decl_type().unwrap_or_default().to_uppercase(),
            )
        }))
    }

    /// Turn an open cursor into records.
    ///
    /// A failure after some rows were read returns them inside
    /// [`Error::Scan`].
    pub fn scan_rows(mut rows: Rows<'_>) -> Result<Vec<Record>> {
        let columns: Vec<(String, bool)> = match rows.as_ref() {
            Some(stmt) => stmt
                .columns()
                .iter()
                .map(|column| (column.name().to_string(), is_boolean(column.decl_type())))
                .collect(),
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(Error::scan(records, e)),
            };
            let mut record = Record::with_capacity(columns.len());
            for (index, (name, boolean)) in columns.iter().enumerate() {
                let cell = match row.get_ref(index) {
                    Ok(cell) => cell,
                    Err(e) => return Err(Error::scan(records, e)),
                };
                record.insert(name.clone(), to_value(cell, *boolean));
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Run a query and scan every resulting row.
    pub fn query_records(&self, query: &str, args: &[Value]) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(query.trim())?;
        let rows = stmt.query(params_from_iter(args.iter()))?;
        Self::scan_rows(rows)
    }
}

fn is_boolean(decl_type: Option<&str>) -> bool {
    decl_type.is_some_and(|t| t.eq_ignore_ascii_case("BOOLEAN") || t.eq_ignore_ascii_case("BOOL"))
}

fn to_value(cell: ValueRef<'_>, boolean: bool) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if boolean => Value::Boolean(i > 0),
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

#[async_trait]
impl Database for SqliteDb {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn is_connected(&self) -> bool {
        SqliteDb::is_connected(self)
    }

    async fn exec(&self, query: &str, args: &[Value]) -> Result<u64> {
        SqliteDb::exec(self, query, args).map(|changed| changed as u64)
    }

    async fn query_records(&self, query: &str, args: &[Value]) -> Result<Vec<Record>> {
        SqliteDb::query_records(self, query, args)
    }

    async fn get_sql_table_info(&self, table: &str) -> Result<ColumnInfo> {
        SqliteDb::get_sql_table_info(self, table)
    }

    async fn get_table_info(&self, table: &str) -> Result<ColumnInfo> {
        SqliteDb::get_table_info(self, table)
    }

    async fn close(&mut self) -> Result<()> {
        SqliteDb::close(self)
    }
}
