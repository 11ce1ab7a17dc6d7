//! MySQL wrapper over a single `sqlx` connection.
//!
//! Cells are rendered to their textual form and re-typed by the column's
//! declared type name, see [`classify`] and [`coerce_value`].

use std::fmt;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlQueryResult,
    MySqlRow,
};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{check_database_name, check_table_name, ColumnInfo, Database};
use crate::error::{Error, Result};
use crate::value::{Record, Value};

pub const ENV_HOST: &str = "MYSQL_HOST";
pub const ENV_USER: &str = "MYSQL_USER";
pub const ENV_PASSWORD: &str = "MYSQL_PWD";
pub const ENV_DATABASE: &str = "MYSQL_DATABASE";
pub const ENV_ALLOW_NATIVE_PASSWORDS: &str = "MYSQL_ALLOW_NATIVE_PASSWORDS";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;

/// MySQL connection settings
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MySqlConfig {
    /// `host[:port]`, or a unix socket path starting with `/`
    pub host: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Legacy authentication flag. The client negotiates the auth plugin
    /// itself, so this is kept for config compatibility only.
    pub allow_native_passwords: bool,
    /// Schema selected with `USE` after connecting
    pub database: String,
    /// Run `CREATE DATABASE IF NOT EXISTS` before selecting the schema
    pub auto_create: bool,
}

impl fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("allow_native_passwords", &self.allow_native_passwords)
            .field("database", &self.database)
            .field("auto_create", &self.auto_create)
            .finish()
    }
}

impl MySqlConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Overlay settings from the `MYSQL_*` environment variables.
    ///
    /// Host, user, password and the legacy auth flag are replaced when their
    /// variable is set; the database is only filled in when blank.
    pub fn overlay_env(&mut self) {
        self.overlay_from(|key| std::env::var(key).ok());
    }

    fn overlay_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.database.is_empty() {
            if let Some(database) = var(ENV_DATABASE) {
                self.database = database;
            }
        }
        if let Some(host) = var(ENV_HOST) {
            self.host = host;
        }
        if let Some(user) = var(ENV_USER) {
            self.user = user;
        }
        if let Some(password) = var(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(flag) = var(ENV_ALLOW_NATIVE_PASSWORDS) {
            self.allow_native_passwords = flag == "true";
        }
    }

    /// Client options for the configured host and credentials. The schema is
    /// not part of the options; it is selected after connecting.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .username(&self.user)
            .password(&self.password);

        let host = self.host.trim();
        if host.starts_with('/') {
            options = options.socket(host);
        } else if host.is_empty() {
            options = options.host(DEFAULT_HOST).port(DEFAULT_PORT);
        } else {
            let (name, port) = match host.rsplit_once(':') {
                Some((name, port)) => {
                    let port = port.parse::<u16>().map_err(|_| {
                        Error::InvalidArgument(format!("invalid port in host {host:?}"))
                    })?;
                    (name, port)
                }
                None => (host, DEFAULT_PORT),
            };
            let name = if name.is_empty() { DEFAULT_HOST } else { name };
            options = options.host(name).port(port);
        }
        Ok(options)
    }
}

/// MySQL connection plus the config it was opened with
#[derive(Debug, Default)]
pub struct MySqlDb {
    config: MySqlConfig,
    connection: Option<Mutex<MySqlConnection>>,
}

impl MySqlDb {
    /// Create an unconnected wrapper
    pub fn new(config: MySqlConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Create and connect in one step
    pub async fn open(config: MySqlConfig, check_env: bool) -> Result<Self> {
        let mut db = Self::new(config);
        db.connect(check_env).await?;
        Ok(db)
    }

    pub fn config(&self) -> &MySqlConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MySqlConfig {
        &mut self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the connection, ping it, and select the configured schema.
    ///
    /// The handle is kept even when the schema cannot be created or
    /// selected. Connecting again drops the previous handle.
    pub async fn connect(&mut self, check_env: bool) -> Result<()> {
        if check_env {
            self.config.overlay_env();
        }
        let database = self.config.database.clone();
        if !database.is_empty() && !check_database_name(&database) {
            return Err(Error::InvalidArgument(format!("invalid database name {database:?}")));
        }

        let options = self.config.connect_options()?;
        debug!(
            host = %self.config.host,
            user = %self.config.user,
            database = %database,
            allow_native_passwords = self.config.allow_native_passwords,
            auto_create = self.config.auto_create,
            "connecting to mysql"
        );
        let connection = MySqlConnection::connect_with(&options).await?;
        self.connection = Some(Mutex::new(connection));

        let mut conn = self.conn().await?;
        conn.ping().await?;
        if !database.is_empty() {
            if self.config.auto_create {
                let create = format!("CREATE DATABASE IF NOT EXISTS {database};");
                (&mut *conn).execute(create.as_str()).await?;
            }
            let select = format!("USE {database};");
            (&mut *conn).execute(select.as_str()).await?;
        }
        Ok(())
    }

    /// Close the connection; the wrapper is disconnected even if closing fails.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.into_inner().close().await?;
        }
        Ok(())
    }

    async fn conn(&self) -> Result<MutexGuard<'_, MySqlConnection>> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        Ok(connection.lock().await)
    }

    /// Execute a statement. Without arguments it goes over the text protocol.
    pub async fn exec(&self, query: &str, args: &[Value]) -> Result<MySqlQueryResult> {
        let query = query.trim();
        let mut conn = self.conn().await?;
        let result = if args.is_empty() {
            (&mut *conn).execute(query).await?
        } else {
            bind_args(sqlx::query(query), args).execute(&mut *conn).await?
        };
        Ok(result)
    }

    /// Run a query and return the raw rows.
    pub async fn query(&self, query: &str, args: &[Value]) -> Result<Vec<MySqlRow>> {
        let query = query.trim();
        let mut conn = self.conn().await?;
        let rows = if args.is_empty() {
            (&mut *conn).fetch_all(query).await?
        } else {
            bind_args(sqlx::query(query), args).fetch_all(&mut *conn).await?
        };
        Ok(rows)
    }

    /// Run a query expected to return at least one row and return the first.
    pub async fn query_row(&self, query: &str, args: &[Value]) -> Result<MySqlRow> {
        let query = query.trim();
        let mut conn = self.conn().await?;
        let row = if args.is_empty() {
            (&mut *conn).fetch_one(query).await?
        } else {
            bind_args(sqlx::query(query), args).fetch_one(&mut *conn).await?
        };
        Ok(row)
    }

    fn schema_and_table(&self, table: &str) -> Result<&str> {
        let database = self.config.database.as_str();
        if database.is_empty() {
            return Err(Error::InvalidArgument("database cannot be blank".to_string()));
        }
        if table.is_empty() {
            return Err(Error::InvalidArgument("table cannot be blank".to_string()));
        }
        if !check_database_name(database) {
            return Err(Error::InvalidArgument(format!("invalid database name {database:?}")));
        }
        if !check_table_name(table) {
            return Err(Error::InvalidArgument(format!("invalid table name {table:?}")));
        }
        Ok(database)
    }

    /// Whether `table` exists in the configured schema.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let database = self.schema_and_table(table)?;

        let row = sqlx::query(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
        )
        .bind(database)
        .bind(table)
        .fetch_one(&mut *conn)
        .await?;
        let count = cell_text(&row, 0)?
            .and_then(|text| text.trim().parse::<u64>().ok())
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Column metadata from `INFORMATION_SCHEMA.COLUMNS`, in table order.
    pub async fn get_sql_table_info(&self, table: &str) -> Result<ColumnInfo> {
        let mut conn = self.conn().await?;
        let database = self.schema_and_table(table)?;
        debug!(database, table, "reading column catalog");

        let rows = sqlx::query(
            "SELECT ORDINAL_POSITION, COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        let mut info = ColumnInfo::new();
        for row in &rows {
            let sequence = cell_text(row, 0)?
                .and_then(|t| t.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let name = cell_text(row, 1)?.unwrap_or_default();
            let type_name = cell_text(row, 2)?.unwrap_or_default();
            info.push(sequence, name, type_name);
        }
        Ok(info)
    }

    /// Column metadata from a prepared `SELECT * FROM <db>.<table> LIMIT 1`.
    pub async fn get_table_info(&self, table: &str) -> Result<ColumnInfo> {
        let mut conn = self.conn().await?;
        let database = self.schema_and_table(table)?;

        let query = format!("SELECT * FROM {database}.{table} LIMIT 1;");
        let stmt = (&mut *conn).prepare(query.as_str()).await?;
        Ok(Self::get_rows_info(stmt.columns()))
    }

    /// Column metadata from result or statement columns, numbered from 1.
    pub fn get_rows_info(columns: &[MySqlColumn]) -> ColumnInfo {
        ColumnInfo::from_ordered(columns.iter().map(|column| {
            (
                column.name().to_string(),
                driver_type_name(column.type_info().name()),
            )
        }))
    }

    /// Drain a row stream into records.
    ///
    /// A failure after some rows were read returns them inside
    /// [`Error::Scan`].
    pub async fn scan_rows<S>(mut rows: S) -> Result<Vec<Record>>
    where
        S: Stream<Item = std::result::Result<MySqlRow, sqlx::Error>> + Unpin,
    {
        let mut records = Vec::new();
        let mut columns: Option<Vec<(String, String)>> = None;

        while let Some(row) = rows.next().await {
            let row = match row {
                Ok(row) => row,
                Err(e) => return Err(Error::scan(records, e)),
            };
            let columns = columns.get_or_insert_with(|| {
                row.columns()
                    .iter()
                    .map(|c| (c.name().to_string(), driver_type_name(c.type_info().name())))
                    .collect()
            });

            let mut cells = Vec::with_capacity(columns.len());
            for (index, (name, type_name)) in columns.iter().enumerate() {
                match cell_bytes(&row, index) {
                    Ok(cell) => cells.push((name.as_str(), type_name.as_str(), cell)),
                    Err(e) => return Err(Error::scan(records, e)),
                }
            }
            records.push(build_record(cells));
        }
        Ok(records)
    }

    /// Run a query and scan every resulting row.
    pub async fn query_records(&self, query: &str, args: &[Value]) -> Result<Vec<Record>> {
        let query = query.trim();
        let mut conn = self.conn().await?;
        if args.is_empty() {
            Self::scan_rows((&mut *conn).fetch(query)).await
        } else {
            Self::scan_rows(bind_args(sqlx::query(query), args).fetch(&mut *conn)).await
        }
    }
}

fn bind_args<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Integer(i) => query.bind(*i),
            Value::Real(f) => query.bind(*f),
            Value::Boolean(b) => query.bind(*b),
            Value::Text(s) => query.bind(s.clone()),
            Value::Blob(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Textual form of one cell, `None` for SQL NULL.
fn cell_text(row: &MySqlRow, index: usize) -> std::result::Result<Option<String>, sqlx::Error> {
    Ok(cell_bytes(row, index)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Render a cell to the bytes the text protocol would have sent.
///
/// Binary-protocol numbers and dates are decoded and formatted; everything
/// else (strings, blobs, decimals) already arrives as bytes.
fn cell_bytes(row: &MySqlRow, index: usize) -> std::result::Result<Option<Vec<u8>>, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(None);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    // f64 also accepts FLOAT columns but widens them, so f32 goes first
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(index) {
        return Ok(Some(v.to_string().into_bytes()));
    }
    row.try_get_unchecked::<Vec<u8>, _>(index).map(Some)
}

/// Rewrite a sqlx column type name to the name the server's catalog and
/// classic drivers use: `TINYINT(1)` columns are reported as `TINYINT`, and
/// unsigned types as `UNSIGNED <T>`.
pub fn driver_type_name(sqlx_name: &str) -> String {
    let name = sqlx_name.trim().to_uppercase();
    if name == "BOOLEAN" {
        return "TINYINT".to_string();
    }
    match name.strip_suffix(" UNSIGNED") {
        Some(base) => format!("UNSIGNED {base}"),
        None => name,
    }
}

/// Assemble one record from `(column, declared type, cell)` triples.
/// A repeated column name keeps the last cell.
pub fn build_record<'a, I>(cells: I) -> Record
where
    I: IntoIterator<Item = (&'a str, &'a str, Option<Vec<u8>>)>,
{
    cells
        .into_iter()
        .map(|(name, type_name, cell)| (name.to_string(), coerce_value(type_name, cell)))
        .collect()
}

/// Target kind for a declared MySQL column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Blob,
    Boolean,
    Text,
}

/// Map an uppercased declared type name to the kind its cells coerce to.
pub fn classify(type_name: &str) -> ColumnKind {
    match type_name {
        "BIGINT" | "BIT" | "BIT VARYING" | "INT" | "INTEGER" | "MEDIUMINT" | "SERIAL"
        | "SMALLINT" | "SMALLSERIAL" | "TINYINT" => ColumnKind::Integer,
        "DEC" | "DECIMAL" | "DOUBLE" | "DOUBLE PRECISION" | "FIXED" | "FLOAT" | "NUMERIC"
        | "REAL" => ColumnKind::Real,
        "BIGSERIAL" | "BINARY" | "BLOB" | "BYTE" | "BYTEA" | "LONGBLOB" | "TINYBLOB"
        | "VARBINARY" => ColumnKind::Blob,
        "BOOL" | "BOOLEAN" => ColumnKind::Boolean,
        _ => ColumnKind::Text,
    }
}

/// Re-type a cell's textual form by its column's declared type.
pub fn coerce_value(type_name: &str, cell: Option<Vec<u8>>) -> Value {
    let Some(bytes) = cell else {
        return Value::Null;
    };
    match classify(&type_name.to_uppercase()) {
        ColumnKind::Blob => Value::Blob(bytes),
        kind => {
            let text = String::from_utf8_lossy(&bytes);
            match kind {
                ColumnKind::Integer => Value::parse_integer(&text),
                ColumnKind::Real => Value::parse_real(&text),
                ColumnKind::Boolean => Value::parse_bool(&text),
                _ => Value::Text(text.into_owned()),
            }
        }
    }
}

#[async_trait]
impl Database for MySqlDb {
    fn backend_name(&self) -> &'static str {
        "mysql"
    }

    fn is_connected(&self) -> bool {
        MySqlDb::is_connected(self)
    }

    async fn exec(&self, query: &str, args: &[Value]) -> Result<u64> {
        Ok(MySqlDb::exec(self, query, args).await?.rows_affected())
    }

    async fn query_records(&self, query: &str, args: &[Value]) -> Result<Vec<Record>> {
        MySqlDb::query_records(self, query, args).await
    }

    async fn get_sql_table_info(&self, table: &str) -> Result<ColumnInfo> {
        MySqlDb::get_sql_table_info(self, table).await
    }

    async fn get_table_info(&self, table: &str) -> Result<ColumnInfo> {
        MySqlDb::get_table_info(self, table).await
    }

    async fn close(&mut self) -> Result<()> {
        MySqlDb::close(self).await
    }
}
