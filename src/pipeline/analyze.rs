// Analyze one URL for a publisher and persist the outcome.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::analyzer::{AnalysisOutcome, Analyzer};
use crate::db::Database;
use crate::urls::normalize_url;

/// Analyze `url` on behalf of `publisher` and store the result.
///
/// The URL is normalized first so query-string noise doesn't create
/// duplicate rows. An unknown publisher is logged and skipped (`Ok(None)`).
/// Pages that can't be fetched are still saved, with no keywords.
pub async fn analyze_url(
    analyzer: &Analyzer,
    db: &dyn Database,
    url: &str,
    publisher: &str,
) -> Result<Option<AnalysisOutcome>> {
    let normalized = normalize_url(url)?;

    if db.get_publisher(publisher).await?.is_none() {
        warn!(publisher = publisher, url = normalized.as_str(), "Publisher does not exist, not analyzing");
        return Ok(None);
    }

    let outcome = analyzer.analyze(&normalized).await?;

    db.save_analysis(
        &normalized,
        publisher,
        outcome.keywords.as_deref(),
        outcome.embedding.as_deref(),
        outcome.language.as_ref().map(|guess| guess.language.code()),
        Utc::now(),
    )
    .await?;

    info!(
        url = normalized.as_str(),
        publisher = publisher,
        keywords = ?outcome.keywords,
        "Saved analysis"
    );

    Ok(Some(outcome))
}
