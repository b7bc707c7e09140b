// Similar-URL lookup by embedding distance.

use anyhow::Result;
use tracing::info;

use crate::analyzer::Analyzer;
use crate::db::models::SimilarUrl;
use crate::db::Database;
use crate::topics::embeddings::rank_by_distance;
use crate::urls::normalize_url;

pub const DEFAULT_LIMIT: usize = 10;

/// Embed `url` and return the stored URLs closest to it, nearest first.
///
/// The query URL itself is left out of the results.
pub async fn find_similar(
    analyzer: &Analyzer,
    db: &dyn Database,
    url: &str,
    limit: usize,
) -> Result<Vec<SimilarUrl>> {
    if !analyzer.embeds() {
        anyhow::bail!(
            "Backend '{}' does not produce embeddings; use the st backend or install the sentence model",
            analyzer.backend_name()
        );
    }

    let normalized = normalize_url(url)?;
    let outcome = analyzer.analyze(&normalized).await?;
    let Some(query) = outcome.embedding else {
        anyhow::bail!("Could not embed {normalized}: page unavailable or has no text");
    };

    let candidates: Vec<((String, String), Vec<f64>)> = db
        .urls_with_embeddings()
        .await?
        .into_iter()
        .filter(|row| row.url != normalized)
        .filter_map(|row| row.embedding.map(|vector| ((row.url, row.publisher), vector)))
        .collect();

    let ranked = rank_by_distance(&query, candidates, limit);
    info!(url = normalized.as_str(), results = ranked.len(), "Ranked similar URLs");

    Ok(ranked
        .into_iter()
        .map(|((url, publisher), distance)| SimilarUrl {
            url,
            publisher,
            distance,
        })
        .collect())
}
