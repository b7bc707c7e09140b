// HTTP page fetcher.
//
// Pages are fetched the way the ad server would see them: a single GET with
// the analyzer's user agent, a short timeout, and no redirect following. A
// redirecting URL is a different page than the one the ad was served on.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::{debug, info};

use super::rate_limiter::RateLimiter;
use super::traits::{FetchedPage, PageFetcher};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Build the analyzer user agent: `Topical Analyzer/{version} <{site_domain}>`.
pub fn user_agent(site_domain: &str) -> String {
    format!(
        "Topical Analyzer/{} <{}>",
        env!("CARGO_PKG_VERSION"),
        site_domain
    )
}

/// Request settings for page fetching.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub follow_redirects: bool,
    /// Shared request rate cap; `None` means unthrottled
    pub requests_per_second: Option<f64>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: user_agent("localhost"),
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: false,
            requests_per_second: None,
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    rate_limiter: Option<RateLimiter>,
}

impl HttpPageFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let redirect = if options.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .redirect(redirect)
            .build()
            .context("Failed to build HTTP client")?;

        let rate_limiter = match options.requests_per_second {
            Some(rps) if rps > 0.0 => Some(RateLimiter::new(rps)),
            Some(rps) => anyhow::bail!("Fetch rate must be positive, got {rps}"),
            None => None,
        };

        Ok(Self {
            client,
            rate_limiter,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                info!(url = url, error = %e, "Failed to fetch page");
                return None;
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                info!(url = url, error = %e, "Failed to read page body");
                return None;
            }
        };

        debug!(url = url, status = status, bytes = body.len(), "Fetched page");

        Some(FetchedPage {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        let ua = user_agent("server.example.com");
        assert!(ua.starts_with("Topical Analyzer/"));
        assert!(ua.ends_with(" <server.example.com>"));
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(!options.follow_redirects);
        assert!(options.requests_per_second.is_none());
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let options = FetchOptions {
            requests_per_second: Some(0.0),
            ..FetchOptions::default()
        };
        assert!(HttpPageFetcher::new(&options).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_none() {
        let fetcher = HttpPageFetcher::new(&FetchOptions::default()).unwrap();
        // Port 9 on localhost refuses connections without touching the network
        assert!(fetcher.fetch("http://127.0.0.1:9/").await.is_none());
    }
}
