// Database schema: table creation and migrations.
//
// A `schema_version` table tracks which migrations have run; each later
// migration is a function that executes its SQL once.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Sites that serve ads; analyzed URLs belong to one
        CREATE TABLE IF NOT EXISTS publishers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per (normalized URL, publisher)
        CREATE TABLE IF NOT EXISTS analyzed_urls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            publisher_id INTEGER NOT NULL REFERENCES publishers(id) ON DELETE CASCADE,
            keywords TEXT,                     -- JSON array; NULL when the page couldn't be fetched
            language TEXT,                     -- ISO 639-1 code of the detected language
            last_analyzed_date TEXT,
            last_ad_served_date TEXT,
            visits_since_last_analyzed INTEGER NOT NULL DEFAULT 0,
            created TEXT NOT NULL DEFAULT (datetime('now')),
            modified TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (url, publisher_id)
        );

        -- Re-analysis scans by age
        CREATE INDEX IF NOT EXISTS idx_analyzed_urls_last_analyzed
            ON analyzed_urls(last_analyzed_date);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: sentence embedding per URL (384 floats as a JSON array)
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE analyzed_urls ADD COLUMN embedding TEXT;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the user tables in the database (init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
