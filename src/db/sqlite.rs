// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// Connection is !Sync, so it sits behind a tokio Mutex. Trait methods lock,
// run the synchronous query from queries.rs, and return without holding the
// lock across an await.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{AnalyzedUrl, DbCounts, Publisher};
use super::queries;
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn add_publisher(&self, slug: &str, name: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::add_publisher(&conn, slug, name)
    }

    async fn get_publisher(&self, slug: &str) -> Result<Option<Publisher>> {
        let conn = self.conn.lock().await;
        queries::get_publisher(&conn, slug)
    }

    async fn list_publishers(&self) -> Result<Vec<Publisher>> {
        let conn = self.conn.lock().await;
        queries::list_publishers(&conn)
    }

    async fn save_analysis(
        &self,
        url: &str,
        publisher: &str,
        keywords: Option<&[String]>,
        embedding: Option<&[f64]>,
        language: Option<&str>,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::save_analysis(&conn, url, publisher, keywords, embedding, language, analyzed_at)
    }

    async fn record_visits(
        &self,
        url: &str,
        publisher: &str,
        visits: u32,
        served_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::record_visits(&conn, url, publisher, visits, served_at)
    }

    async fn get_analyzed_url(&self, url: &str, publisher: &str) -> Result<Option<AnalyzedUrl>> {
        let conn = self.conn.lock().await;
        queries::get_analyzed_url(&conn, url, publisher)
    }

    async fn urls_due_for_analysis(
        &self,
        cutoff: DateTime<Utc>,
        min_visits: u32,
    ) -> Result<Vec<AnalyzedUrl>> {
        let conn = self.conn.lock().await;
        queries::urls_due_for_analysis(&conn, cutoff, min_visits)
    }

    async fn urls_with_embeddings(&self) -> Result<Vec<AnalyzedUrl>> {
        let conn = self.conn.lock().await;
        queries::urls_with_embeddings(&conn)
    }

    async fn counts(&self) -> Result<DbCounts> {
        let conn = self.conn.lock().await;
        queries::counts(&conn)
    }
}
