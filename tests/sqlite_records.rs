use anyhow::Result;
use rust_utils::database::{Database, SqliteConfig, SqliteDb};
use rust_utils::{Error, Value};
use tempfile::{NamedTempFile, TempDir};

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(SqliteDb, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let path = temp_file.path().to_string_lossy().into_owned();
    let db = SqliteDb::open(SqliteConfig::new(path))?;
    initialize_schema(&db)?;
    Ok((db, temp_file))
}

// Initialize the database schema
fn initialize_schema(db: &SqliteDb) -> Result<()> {
    db.exec(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            age INTEGER,
            active BOOLEAN
        );
        "#,
        &[],
    )?;
    Ok(())
}

fn insert_user(db: &SqliteDb, name: &str, email: &str, age: Option<i64>, active: bool) -> Result<()> {
    db.exec(
        "INSERT INTO users (name, email, age, active) VALUES (?1, ?2, ?3, ?4)",
        &[name.into(), email.into(), age.into(), active.into()],
    )?;
    Ok(())
}

#[test]
fn test_query_records() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    insert_user(&db, "John Doe", "john@example.com", Some(30), true)?;
    insert_user(&db, "Jane Roe", "jane@example.com", None, false)?;

    let records = db.query_records("SELECT * FROM users ORDER BY id", &[])?;
    assert_eq!(records.len(), 2);

    let john = &records[0];
    assert_eq!(john["id"], Value::Integer(1));
    assert_eq!(john["name"], Value::Text("John Doe".to_string()));
    assert_eq!(john["age"], Value::Integer(30));
    assert_eq!(john["active"], Value::Boolean(true));

    let jane = &records[1];
    assert_eq!(jane["age"], Value::Null);
    assert_eq!(jane["active"], Value::Boolean(false));
    Ok(())
}

#[test]
fn test_query_records_no_rows() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    let records = db.query_records("SELECT * FROM users WHERE age > ?", &[Value::Integer(100)])?;
    assert!(records.is_empty());
    Ok(())
}

#[test]
fn test_records_are_independent() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    insert_user(&db, "John Doe", "john@example.com", Some(30), true)?;

    let mut first = db.query_records("SELECT name FROM users", &[])?;
    first[0].insert("name".to_string(), Value::from("changed"));
    let second = db.query_records("SELECT name FROM users", &[])?;
    assert_eq!(second[0]["name"], Value::from("John Doe"));
    Ok(())
}

#[test]
fn test_query_passthrough() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    insert_user(&db, "John Doe", "john@example.com", Some(30), true)?;

    let changed = db.exec("UPDATE users SET age = ? WHERE id = ?", &[Value::Integer(31), Value::Integer(1)])?;
    assert_eq!(changed, 1);

    let age: i64 = db.query_row("SELECT age FROM users WHERE id = ?", &[Value::Integer(1)], |row| row.get(0))?;
    assert_eq!(age, 31);

    let emails: Vec<String> = db.query("SELECT email FROM users", &[], |row| row.get(0))?;
    assert_eq!(emails, vec!["john@example.com".to_string()]);
    Ok(())
}

#[test]
fn test_table_info() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;

    let catalog = db.get_sql_table_info("users")?;
    let names: Vec<&str> = catalog.names().collect();
    assert_eq!(names, vec!["id", "name", "email", "age", "active"]);
    assert_eq!(catalog.columns[0].sequence, 1);
    assert_eq!(catalog.type_of("active"), Some("BOOLEAN"));

    // empty table still yields the columns
    let cursor = db.get_table_info("users")?;
    assert_eq!(cursor.len(), 5);
    assert_eq!(cursor.columns[4].sequence, 5);
    assert_eq!(cursor.type_of("name"), Some("TEXT"));

    assert!(matches!(db.get_table_info(""), Err(Error::InvalidArgument(_))));
    assert!(matches!(db.get_sql_table_info(""), Err(Error::InvalidArgument(_))));
    Ok(())
}

#[test]
fn test_connect_named_database() -> Result<()> {
    let dir = TempDir::new()?;
    let dir_path = dir.path().to_string_lossy().into_owned();

    let mut db = SqliteDb::new(SqliteConfig::named(dir_path.clone(), "foo.sqlite").with_auto_create(true));
    db.connect()?;
    assert_eq!(db.config().database, "foo");
    assert_eq!(db.config().database_ext, "sqlite");
    assert!(dir.path().join("foo.sqlite").exists());

    // reconnecting resolves to the same file
    db.connect()?;
    assert_eq!(db.config().file_path, format!("{}/foo.sqlite", dir_path.trim_end_matches('/')));
    db.close()?;
    Ok(())
}

#[test]
fn test_connect_missing_file() -> Result<()> {
    let dir = TempDir::new()?;
    let mut db = SqliteDb::new(SqliteConfig::named(dir.path().to_string_lossy(), "missing"));
    assert!(matches!(db.connect(), Err(Error::NotFound(_))));
    assert!(!db.is_connected());

    let mut db = SqliteDb::new(SqliteConfig::default());
    assert!(matches!(db.connect(), Err(Error::InvalidState(_))));
    Ok(())
}

#[test]
fn test_close() -> Result<()> {
    let (mut db, _temp_file) = create_temp_db()?;
    db.close()?;
    db.close()?;
    assert!(matches!(db.query_records("SELECT * FROM users", &[]), Err(Error::NotConnected)));
    assert!(matches!(db.get_sql_table_info("users"), Err(Error::NotConnected)));
    Ok(())
}

#[test]
fn test_bad_query() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    let err = db.query_records("SELECT * FROM nope", &[]).unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)));
    assert!(err.partial_records().is_none());
    Ok(())
}

#[tokio::test]
async fn test_database_trait() -> Result<()> {
    let (db, _temp_file) = create_temp_db()?;
    let mut db: Box<dyn Database> = Box::new(db);
    assert_eq!(db.backend_name(), "sqlite");

    let changed = db
        .exec(
            "INSERT INTO users (name, email, age) VALUES (?, ?, ?)",
            &["John Doe".into(), "john@example.com".into(), Value::Integer(30)],
        )
        .await?;
    assert_eq!(changed, 1);

    let records = db.query_records("SELECT name, age FROM users", &[]).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["age"], Value::Integer(30));

    let info = db.get_table_info("users").await?;
    assert_eq!(info.len(), 5);

    db.close().await?;
    assert!(!db.is_connected());
    Ok(())
}
