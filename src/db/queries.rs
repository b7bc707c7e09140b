// Database queries: CRUD operations for publishers and analyzed URLs.
//
// Every database interaction goes through this module. Timestamps are passed
// in by the caller and stored as SQLite datetime text (UTC), so string order
// is time order.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{AnalyzedUrl, DbCounts, Publisher};
use crate::analyzer::validate_keywords;

/// Format a timestamp the way SQLite's datetime() does.
pub fn sql_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

// --- Publishers ---

/// Create a publisher, or rename it if the slug exists.
pub fn add_publisher(conn: &Connection, slug: &str, name: &str) -> Result<()> {
    if slug.trim().is_empty() {
        anyhow::bail!("Publisher slug must not be empty");
    }
    conn.execute(
        "INSERT INTO publishers (slug, name) VALUES (?1, ?2)
         ON CONFLICT(slug) DO UPDATE SET name = ?2",
        params![slug, name],
    )?;
    Ok(())
}

pub fn get_publisher(conn: &Connection, slug: &str) -> Result<Option<Publisher>> {
    let result = conn
        .query_row(
            "SELECT slug, name FROM publishers WHERE slug = ?1",
            params![slug],
            |row| {
                Ok(Publisher {
                    slug: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(result)
}

pub fn list_publishers(conn: &Connection) -> Result<Vec<Publisher>> {
    let mut stmt = conn.prepare("SELECT slug, name FROM publishers ORDER BY slug")?;
    let rows = stmt.query_map([], |row| {
        Ok(Publisher {
            slug: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut publishers = Vec::new();
    for row in rows {
        publishers.push(row?);
    }
    Ok(publishers)
}

fn publisher_id(conn: &Connection, slug: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM publishers WHERE slug = ?1",
        params![slug],
        |row| row.get(0),
    )
    .optional()?
    .with_context(|| format!("Unknown publisher '{slug}'"))
}

// --- Analyzed URLs ---

/// Store the result of analyzing a URL.
///
/// Creates the row if needed. Either way the analysis date is set and the
/// visit counter starts over.
pub fn save_analysis(
    conn: &Connection,
    url: &str,
    publisher: &str,
    keywords: Option<&[String]>,
    embedding: Option<&[f64]>,
    language: Option<&str>,
    analyzed_at: DateTime<Utc>,
) -> Result<()> {
    if let Some(keywords) = keywords {
        validate_keywords(keywords)?;
    }
    let publisher_id = publisher_id(conn, publisher)?;
    let keywords_json = keywords.map(serde_json::to_string).transpose()?;
    let embedding_json = embedding.map(serde_json::to_string).transpose()?;
    let now = sql_datetime(analyzed_at);

    conn.execute(
        "INSERT INTO analyzed_urls
            (url, publisher_id, keywords, embedding, language, last_analyzed_date,
             visits_since_last_analyzed, created, modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?6, ?6)
         ON CONFLICT(url, publisher_id) DO UPDATE SET
            keywords = ?3,
            embedding = ?4,
            language = ?5,
            last_analyzed_date = ?6,
            visits_since_last_analyzed = 0,
            modified = ?6",
        params![url, publisher_id, keywords_json, embedding_json, language, now],
    )?;
    Ok(())
}

/// Add ad views to a URL, creating an unanalyzed row if needed.
pub fn record_visits(
    conn: &Connection,
    url: &str,
    publisher: &str,
    visits: u32,
    served_at: DateTime<Utc>,
) -> Result<()> {
    let publisher_id = publisher_id(conn, publisher)?;
    let served = sql_datetime(served_at);

    conn.execute(
        "INSERT INTO analyzed_urls
            (url, publisher_id, last_ad_served_date, visits_since_last_analyzed, created, modified)
         VALUES (?1, ?2, ?3, ?4, ?3, ?3)
         ON CONFLICT(url, publisher_id) DO UPDATE SET
            visits_since_last_analyzed = visits_since_last_analyzed + ?4,
            last_ad_served_date = ?3,
            modified = ?3",
        params![url, publisher_id, served, visits],
    )?;
    Ok(())
}

const ANALYZED_URL_COLUMNS: &str = "a.url, p.slug, a.keywords, a.embedding, a.language,
    a.last_analyzed_date, a.last_ad_served_date, a.visits_since_last_analyzed,
    a.created, a.modified";

fn row_to_analyzed_url(row: &Row<'_>) -> rusqlite::Result<AnalyzedUrl> {
    let keywords_json: Option<String> = row.get(2)?;
    let embedding_json: Option<String> = row.get(3)?;
    Ok(AnalyzedUrl {
        url: row.get(0)?,
        publisher: row.get(1)?,
        keywords: keywords_json.and_then(|json| serde_json::from_str(&json).ok()),
        embedding: embedding_json.and_then(|json| serde_json::from_str(&json).ok()),
        language: row.get(4)?,
        last_analyzed_date: row.get(5)?,
        last_ad_served_date: row.get(6)?,
        visits_since_last_analyzed: row.get(7)?,
        created: row.get(8)?,
        modified: row.get(9)?,
    })
}

pub fn get_analyzed_url(conn: &Connection, url: &str, publisher: &str) -> Result<Option<AnalyzedUrl>> {
    let sql = format!(
        "SELECT {ANALYZED_URL_COLUMNS}
         FROM analyzed_urls a JOIN publishers p ON p.id = a.publisher_id
         WHERE a.url = ?1 AND p.slug = ?2"
    );
    let result = conn
        .query_row(&sql, params![url, publisher], row_to_analyzed_url)
        .optional()?;
    Ok(result)
}

/// URLs last analyzed before `cutoff` (or never) with at least `min_visits`
/// ad views since. Busiest first.
pub fn urls_due_for_analysis(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    min_visits: u32,
) -> Result<Vec<AnalyzedUrl>> {
    let sql = format!(
        "SELECT {ANALYZED_URL_COLUMNS}
         FROM analyzed_urls a JOIN publishers p ON p.id = a.publisher_id
         WHERE (a.last_analyzed_date IS NULL OR a.last_analyzed_date < ?1)
           AND a.visits_since_last_analyzed >= ?2
         ORDER BY a.visits_since_last_analyzed DESC, a.url, p.slug"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![sql_datetime(cutoff), min_visits], row_to_analyzed_url)?;

    let mut urls = Vec::new();
    for row in rows {
        urls.push(row?);
    }
    Ok(urls)
}

/// Every URL that has a stored embedding.
pub fn urls_with_embeddings(conn: &Connection) -> Result<Vec<AnalyzedUrl>> {
    let sql = format!(
        "SELECT {ANALYZED_URL_COLUMNS}
         FROM analyzed_urls a JOIN publishers p ON p.id = a.publisher_id
         WHERE a.embedding IS NOT NULL
         ORDER BY a.url, p.slug"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_analyzed_url)?;

    let mut urls = Vec::new();
    for row in rows {
        urls.push(row?);
    }
    Ok(urls)
}

pub fn counts(conn: &Connection) -> Result<DbCounts> {
    let publishers: i64 = conn.query_row("SELECT COUNT(*) FROM publishers", [], |row| row.get(0))?;
    let (analyzed_urls, with_keywords, with_embeddings, never_analyzed): (i64, i64, i64, i64) = conn
        .query_row(
            "SELECT COUNT(*),
                    COUNT(keywords),
                    COUNT(embedding),
                    COALESCE(SUM(last_analyzed_date IS NULL), 0)
             FROM analyzed_urls",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
    Ok(DbCounts {
        publishers,
        analyzed_urls,
        with_keywords,
        with_embeddings,
        never_analyzed,
    })
}
