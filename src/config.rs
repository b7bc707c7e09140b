use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::analyzer::backends::BackendKind;
use crate::classifier::models;
use crate::fetch::client::{user_agent, FetchOptions, DEFAULT_TIMEOUT};

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Which keyword backend analyzes pages (default: textrank)
    pub backend: BackendKind,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Overrides where the sentence embedding model lives
    pub sentence_transformers_home: Option<PathBuf>,
    /// Domain advertised in the fetcher's user agent
    pub site_domain: String,
    pub fetch_timeout: Duration,
    pub follow_redirects: bool,
    pub fetch_requests_per_second: Option<f64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default; malformed values are errors rather than
    /// being silently ignored.
    pub fn load() -> Result<Self> {
        let backend = match env::var("TOPICAL_BACKEND") {
            Ok(name) => name.parse()?,
            Err(_) => BackendKind::TextRank,
        };

        let model_dir = env::var("TOPICAL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| models::default_model_dir());

        let fetch_timeout = match env::var("TOPICAL_FETCH_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs_f64(
                secs.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .with_context(|| format!("TOPICAL_FETCH_TIMEOUT_SECS must be a positive number, got '{secs}'"))?,
            ),
            Err(_) => DEFAULT_TIMEOUT,
        };

        let fetch_requests_per_second = match env::var("TOPICAL_FETCH_RPS") {
            Ok(rps) => Some(
                rps.trim()
                    .parse::<f64>()
                    .with_context(|| format!("TOPICAL_FETCH_RPS must be a number, got '{rps}'"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            db_path: env::var("TOPICAL_DB_PATH").unwrap_or_else(|_| "./topical.db".to_string()),
            backend,
            model_dir,
            sentence_transformers_home: env::var("SENTENCE_TRANSFORMERS_HOME").ok().map(PathBuf::from),
            site_domain: env::var("TOPICAL_SITE_DOMAIN").unwrap_or_else(|_| "localhost".to_string()),
            fetch_timeout,
            follow_redirects: env::var("TOPICAL_FOLLOW_REDIRECTS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            fetch_requests_per_second,
        })
    }

    /// Request settings for the page fetcher.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: user_agent(&self.site_domain),
            timeout: self.fetch_timeout,
            follow_redirects: self.follow_redirects,
            requests_per_second: self.fetch_requests_per_second,
        }
    }

    /// Check that the configured backend has its model files on disk.
    /// Call this before building an analyzer.
    pub fn require_models(&self) -> Result<()> {
        match self.backend {
            BackendKind::Topics => {
                let dir = models::topic_model_dir(&self.model_dir);
                if !models::topic_files_present(&dir) {
                    anyhow::bail!(
                        "Topic model files not found in {}\n\
                         Expected model.onnx, tokenizer.json and labels.json.\n\
                         Or set TOPICAL_BACKEND=textrank to analyze without a model.",
                        dir.display()
                    );
                }
            }
            BackendKind::SentenceTransformer => {
                let dir = models::embedding_model_dir(
                    &self.model_dir,
                    self.sentence_transformers_home.as_deref(),
                );
                if !models::embedding_files_present(&dir) {
                    anyhow::bail!(
                        "Embedding model files not found in {}\n\
                         Expected model.onnx and tokenizer.json.",
                        dir.display()
                    );
                }
            }
            BackendKind::Naive | BackendKind::TextRank | BackendKind::TfIdf => {}
        }
        Ok(())
    }
}

/// Accepts the usual spellings of a boolean environment flag.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
