// Database trait: async interface over the store.
//
// Pipelines hold an `Arc<dyn Database>` so the analyze, aggregation and
// re-analysis tasks can share one store across concurrent futures. The
// methods mirror the free functions in queries.rs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{AnalyzedUrl, DbCounts, Publisher};

#[async_trait]
pub trait Database: Send + Sync {
    /// Count the user tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Publishers ---

    async fn add_publisher(&self, slug: &str, name: &str) -> Result<()>;

    async fn get_publisher(&self, slug: &str) -> Result<Option<Publisher>>;

    async fn list_publishers(&self) -> Result<Vec<Publisher>>;

    // --- Analyzed URLs ---

    /// Store an analysis result, resetting the visit counter.
    async fn save_analysis(
        &self,
        url: &str,
        publisher: &str,
        keywords: Option<&[String]>,
        embedding: Option<&[f64]>,
        language: Option<&str>,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Add ad views served on a URL.
    async fn record_visits(
        &self,
        url: &str,
        publisher: &str,
        visits: u32,
        served_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_analyzed_url(&self, url: &str, publisher: &str) -> Result<Option<AnalyzedUrl>>;

    /// URLs whose analysis is older than `cutoff` and that have had enough views since.
    async fn urls_due_for_analysis(
        &self,
        cutoff: DateTime<Utc>,
        min_visits: u32,
    ) -> Result<Vec<AnalyzedUrl>>;

    async fn urls_with_embeddings(&self) -> Result<Vec<AnalyzedUrl>>;

    async fn counts(&self) -> Result<DbCounts>;
}
