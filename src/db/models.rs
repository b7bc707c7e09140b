// Data models: Rust structs that map to database rows.
//
// Kept apart from the queries so pipeline and output code can use them
// without depending on rusqlite.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A site that serves ads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub slug: String,
    pub name: String,
}

/// Analysis state of one URL on one publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedUrl {
    pub url: String,
    /// Publisher slug
    pub publisher: String,
    /// `None` until the page has been fetched successfully
    pub keywords: Option<Vec<String>>,
    pub embedding: Option<Vec<f64>>,
    pub language: Option<String>,
    pub last_analyzed_date: Option<String>,
    pub last_ad_served_date: Option<String>,
    pub visits_since_last_analyzed: u32,
    pub created: String,
    pub modified: String,
}

impl fmt::Display for AnalyzedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keywords {
            Some(keywords) => {
                let quoted: Vec<String> = keywords.iter().map(|k| format!("'{k}'")).collect();
                write!(f, "[{}] on {}", quoted.join(", "), self.url)
            }
            None => write!(f, "None on {}", self.url),
        }
    }
}

/// A stored URL close to a query page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarUrl {
    pub url: String,
    pub publisher: String,
    /// Cosine distance, 0.0 means same direction
    pub distance: f64,
}

/// Row counts for `topical status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbCounts {
    pub publishers: i64,
    pub analyzed_urls: i64,
    pub with_keywords: i64,
    pub with_embeddings: i64,
    pub never_analyzed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzed_url_display() {
        let mut url = AnalyzedUrl {
            url: "https://docs.example.com/".to_string(),
            publisher: "docs".to_string(),
            keywords: Some(vec!["python".to_string(), "django".to_string()]),
            embedding: None,
            language: None,
            last_analyzed_date: None,
            last_ad_served_date: None,
            visits_since_last_analyzed: 0,
            created: String::new(),
            modified: String::new(),
        };
        assert_eq!(url.to_string(), "['python', 'django'] on https://docs.example.com/");

        url.keywords = Some(Vec::new());
        assert_eq!(url.to_string(), "[] on https://docs.example.com/");

        url.keywords = None;
        assert_eq!(url.to_string(), "None on https://docs.example.com/");
    }
}
