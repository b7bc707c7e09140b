// Analyzer backend trait: the swap-ready abstraction over analysis strategies.
//
// Every backend sees the same prepared page. Keyword backends implement
// analyze_page only; embedding backends also override embed_page.

use anyhow::Result;
use async_trait::async_trait;

use crate::content::extract::{ContentExtractor, ExtractedContent};
use crate::language::LanguageGuess;

/// A fetched page reduced to what backends analyze.
#[derive(Debug, Clone)]
pub struct AnalyzedPage {
    pub url: String,
    pub content: ExtractedContent,
    /// Normalized, punctuation-free, lowercase main text
    pub clean_text: String,
    pub language: Option<LanguageGuess>,
}

#[async_trait]
pub trait AnalyzerBackend: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// How this backend wants main content pulled out of the HTML.
    fn extractor(&self) -> ContentExtractor {
        ContentExtractor::default()
    }

    /// Keywords or topics for the page, lowercase.
    async fn analyze_page(&self, page: &AnalyzedPage) -> Result<Vec<String>>;

    /// Embedding of the page, for backends that produce one.
    async fn embed_page(&self, _page: &AnalyzedPage) -> Result<Option<Vec<f64>>> {
        Ok(None)
    }
}
