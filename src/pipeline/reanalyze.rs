// Periodic re-analysis of busy URLs.
//
// A URL is due when its last analysis is older than `days` and it has been
// served at least `min_visits` ads since. Due URLs are analyzed with bounded
// concurrency; results are saved as each finishes.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::analyze::analyze_url;
use crate::analyzer::Analyzer;
use crate::db::Database;

pub const DEFAULT_DAYS: i64 = 7;
pub const DEFAULT_MIN_VISITS: u32 = 50;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct ReanalyzeOptions {
    pub days: i64,
    pub min_visits: u32,
    pub concurrency: usize,
}

impl Default for ReanalyzeOptions {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            min_visits: DEFAULT_MIN_VISITS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ReanalyzeOptions {
    /// Analyses older than this are stale.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReanalyzeSummary {
    pub due: usize,
    pub analyzed: usize,
    pub failed: usize,
}

/// Re-analyze every URL that is due.
pub async fn reanalyze(
    analyzer: &Analyzer,
    db: &dyn Database,
    options: &ReanalyzeOptions,
    show_progress: bool,
) -> Result<ReanalyzeSummary> {
    let cutoff = options.cutoff(Utc::now());
    let due = db.urls_due_for_analysis(cutoff, options.min_visits).await?;

    let mut summary = ReanalyzeSummary {
        due: due.len(),
        ..ReanalyzeSummary::default()
    };
    if due.is_empty() {
        info!(cutoff = %cutoff, "No URLs due for analysis");
        return Ok(summary);
    }

    info!(
        due = due.len(),
        concurrency = options.concurrency,
        "Re-analyzing URLs"
    );

    let pb = if show_progress {
        let pb = ProgressBar::new(due.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Analyzing [{bar:30}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = stream::iter(due.iter().map(|row| async move {
        let result = analyze_url(analyzer, db, &row.url, &row.publisher).await;
        (row, result)
    }))
    .buffer_unordered(options.concurrency.max(1));

    while let Some((row, result)) = results.next().await {
        match result {
            Ok(_) => summary.analyzed += 1,
            Err(e) => {
                warn!(url = row.url.as_str(), publisher = row.publisher.as_str(), error = %e, "Failed to re-analyze URL");
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        analyzed = summary.analyzed,
        failed = summary.failed,
        "Re-analysis complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_options() {
        let options = ReanalyzeOptions::default();
        assert_eq!(options.days, 7);
        assert_eq!(options.min_visits, 50);
    }

    #[test]
    fn test_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 3, 6, 0, 0).unwrap();
        assert_eq!(ReanalyzeOptions::default().cutoff(now), expected);
    }
}
