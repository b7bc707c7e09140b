// Database layer: SQLite storage for publishers and analyzed URLs.
//
// rusqlite with the "bundled" feature, so there's no system SQLite
// dependency. The database file lives wherever TOPICAL_DB_PATH points
// (defaults to ./topical.db).

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteDatabase;
pub use traits::Database;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Open (or create) the database and run migrations.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {}", db_path))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {}. Run `topical init` first.", db_path);
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // Pick up migrations added since the database was created
    schema::create_tables(&conn)?;

    Ok(conn)
}

/// Open an existing database behind the async Database trait.
pub fn open_shared(db_path: &str) -> Result<Arc<dyn Database>> {
    let conn = open(db_path)?;
    Ok(Arc::new(SqliteDatabase::new(conn)))
}
