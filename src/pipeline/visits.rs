// Daily visit aggregation.
//
// The ad server writes one JSON line per served ad. Once a day the views
// for the previous day are grouped by (normalized URL, publisher) and added
// to each URL's visit counter, which drives re-analysis.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::urls::normalize_url;

/// One served ad from the visit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    pub publisher: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default)]
    pub paid: bool,
}

/// What one aggregation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitSummary {
    /// Distinct (URL, publisher) pairs updated
    pub urls: usize,
    /// Views added across all URLs
    pub visits: u64,
    /// Records in the window that couldn't be used
    pub skipped: usize,
}

/// The day aggregated by default: yesterday, in UTC.
pub fn default_day() -> NaiveDate {
    (Utc::now() - Duration::days(1)).date_naive()
}

/// Parse a JSON-lines visit log. Blank lines are ignored.
pub fn parse_visit_log(contents: &str) -> Result<Vec<VisitRecord>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid visit record on line {}", i + 1))
        })
        .collect()
}

pub fn read_visit_log(path: &Path) -> Result<Vec<VisitRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read visit log {}", path.display()))?;
    parse_visit_log(&contents)
}

/// Add the viewed and paid ads served on `day` to each URL's visit counter.
pub async fn aggregate_visits(
    db: &dyn Database,
    records: &[VisitRecord],
    day: NaiveDate,
) -> Result<VisitSummary> {
    let mut summary = VisitSummary::default();
    // (url, publisher) -> (visits, latest serve time)
    let mut groups: BTreeMap<(String, String), (u32, DateTime<Utc>)> = BTreeMap::new();

    for record in records {
        if record.date.date_naive() != day || !record.viewed || !record.paid {
            continue;
        }
        if record.url.trim().is_empty() {
            summary.skipped += 1;
            continue;
        }
        let url = match normalize_url(&record.url) {
            Ok(url) => url,
            Err(e) => {
                debug!(url = record.url.as_str(), error = %e, "Skipping unparseable visit URL");
                summary.skipped += 1;
                continue;
            }
        };

        let entry = groups
            .entry((url, record.publisher.clone()))
            .or_insert((0, record.date));
        entry.0 += 1;
        entry.1 = entry.1.max(record.date);
    }

    let mut known_publishers: HashSet<String> = HashSet::new();
    let mut unknown_publishers: HashSet<String> = HashSet::new();

    for ((url, publisher), (visits, served_at)) in groups {
        if !known_publishers.contains(&publisher) {
            if unknown_publishers.contains(&publisher) || db.get_publisher(&publisher).await?.is_none() {
                if unknown_publishers.insert(publisher.clone()) {
                    warn!(publisher = publisher.as_str(), "Visits for unknown publisher, skipping");
                }
                summary.skipped += visits as usize;
                continue;
            }
            known_publishers.insert(publisher.clone());
        }

        db.record_visits(&url, &publisher, visits, served_at).await?;
        summary.urls += 1;
        summary.visits += visits as u64;
    }

    info!(
        day = %day,
        urls = summary.urls,
        visits = summary.visits,
        skipped = summary.skipped,
        "Aggregated visits"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_visit_log() {
        let log = r#"{"url": "https://a.example/", "publisher": "docs", "date": "2024-03-01T10:00:00Z", "viewed": true, "paid": true}

{"url": "https://b.example/", "publisher": "docs", "date": "2024-03-01T11:00:00Z"}
"#;
        let records = parse_visit_log(log).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].viewed && records[0].paid);
        assert!(!records[1].viewed && !records[1].paid);
    }

    #[test]
    fn test_parse_visit_log_reports_line() {
        let log = "{\"url\": \"https://a.example/\", \"publisher\": \"docs\", \"date\": \"2024-03-01T10:00:00Z\"}\nnot json\n";
        let err = parse_visit_log(log).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_default_day_is_yesterday() {
        let today = Utc::now().date_naive();
        assert_eq!(default_day().succ_opt(), Some(today));
    }
}
