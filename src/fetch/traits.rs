// Page fetcher trait and the page it produces.

use async_trait::async_trait;

/// A fetched response. Redirects are returned as-is, not followed.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// True for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetch a URL for analysis. Transport failures are not errors: they
/// produce `None`, and callers treat the URL as unanalyzable.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<FetchedPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16) -> FetchedPage {
        FetchedPage {
            url: "https://example.com/".to_string(),
            status,
            content_type: None,
            body: String::new(),
        }
    }

    #[test]
    fn test_is_success() {
        assert!(page(200).is_success());
        assert!(page(204).is_success());
        assert!(!page(301).is_success());
        assert!(!page(404).is_success());
        assert!(!page(500).is_success());
    }
}
