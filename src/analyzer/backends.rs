// Analyzer backends.
//
// naive     corpus keyword counting on the raw main text, like the ad client
// textrank  graph-ranked keyphrases
// tfidf     statistically distinctive words across the page's blocks
// eatopics  pretrained topic classifier
// st        sentence-transformer embedding only, no keywords

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::traits::{AnalyzedPage, AnalyzerBackend};
use crate::classifier::traits::{labels_above, TopicClassifier};
use crate::content::extract::ContentExtractor;
use crate::content::text::{normalize_keep_punctuation, MAX_INPUT_LENGTH};
use crate::language::Language;
use crate::topics::naive::NaiveExtractor;
use crate::topics::textrank::TextRankExtractor;
use crate::topics::tfidf::TfIdfExtractor;
use crate::topics::traits::{KeywordExtractor, ScoredKeyword, TextEmbedder};

/// Shorter texts are not worth classifying.
pub const MIN_TEXT_LENGTH: usize = 500;

/// Topic probabilities must exceed this to be reported.
pub const MODEL_THRESHOLD: f64 = 0.4;

/// Which backend to analyze with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Naive,
    TextRank,
    TfIdf,
    Topics,
    SentenceTransformer,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Naive,
        BackendKind::TextRank,
        BackendKind::TfIdf,
        BackendKind::Topics,
        BackendKind::SentenceTransformer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Naive => "naive",
            BackendKind::TextRank => "textrank",
            BackendKind::TfIdf => "tfidf",
            BackendKind::Topics => "eatopics",
            BackendKind::SentenceTransformer => "st",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                anyhow::anyhow!("Unknown backend '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Keep terms in rank order, lowercase, dropping blanks and repeats.
fn ranked_terms(keywords: Vec<ScoredKeyword>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.term.trim().to_lowercase())
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

/// Counts topic keywords in the first words of the page.
#[derive(Default)]
pub struct NaiveBackend {
    extractor: NaiveExtractor,
}

#[async_trait]
impl AnalyzerBackend for NaiveBackend {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn extractor(&self) -> ContentExtractor {
        ContentExtractor::without_boilerplate_removal()
    }

    async fn analyze_page(&self, page: &AnalyzedPage) -> Result<Vec<String>> {
        let keywords = self.extractor.extract(&page.content.text, Language::English)?;
        Ok(ranked_terms(keywords))
    }
}

#[derive(Default)]
pub struct TextRankBackend {
    extractor: TextRankExtractor,
}

#[async_trait]
impl AnalyzerBackend for TextRankBackend {
    fn name(&self) -> &'static str {
        "textrank"
    }

    async fn analyze_page(&self, page: &AnalyzedPage) -> Result<Vec<String>> {
        let language = page
            .language
            .as_ref()
            .map(|guess| guess.language)
            .unwrap_or(Language::English);
        // Phrases stop at punctuation, so rank the text before it is stripped
        let text = normalize_keep_punctuation(&page.content.text, MAX_INPUT_LENGTH);
        let keywords = self.extractor.extract(&text, language)?;
        Ok(ranked_terms(keywords))
    }
}

#[derive(Default)]
pub struct TfIdfBackend {
    extractor: TfIdfExtractor,
}

#[async_trait]
impl AnalyzerBackend for TfIdfBackend {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    async fn analyze_page(&self, page: &AnalyzedPage) -> Result<Vec<String>> {
        if page.content.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let language = page
            .language
            .as_ref()
            .map(|guess| guess.language)
            .unwrap_or(Language::English);
        let keywords = self.extractor.extract_blocks(&page.content.blocks, language)?;
        Ok(ranked_terms(keywords))
    }
}

/// Multi-label topic classification for English pages.
pub struct TopicModelBackend {
    classifier: Arc<dyn TopicClassifier>,
    pub min_text_length: usize,
    pub threshold: f64,
}

impl TopicModelBackend {
    pub fn new(classifier: Arc<dyn TopicClassifier>) -> Self {
        Self {
            classifier,
            min_text_length: MIN_TEXT_LENGTH,
            threshold: MODEL_THRESHOLD,
        }
    }
}

#[async_trait]
impl AnalyzerBackend for TopicModelBackend {
    fn name(&self) -> &'static str {
        "eatopics"
    }

    async fn analyze_page(&self, page: &AnalyzedPage) -> Result<Vec<String>> {
        let text = &page.clean_text;
        if text.chars().count() < self.min_text_length {
            debug!(url = page.url.as_str(), chars = text.chars().count(), "Text too short to classify");
            return Ok(Vec::new());
        }

        // The model was trained on English only; undetected counts as not English
        let is_english = matches!(
            page.language.as_ref().map(|guess| guess.language),
            Some(Language::English)
        );
        if !is_english {
            debug!(url = page.url.as_str(), "Skipping topic classification for non-English page");
            return Ok(Vec::new());
        }

        let scores = self.classifier.classify(text).await?;
        let labels = labels_above(scores, self.threshold);
        Ok(labels.into_iter().map(|label| label.to_lowercase()).collect())
    }
}

/// Embedding-only backend: no keywords, one vector per page.
pub struct SentenceTransformerBackend {
    embedder: Arc<dyn TextEmbedder>,
}

impl SentenceTransformerBackend {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl AnalyzerBackend for SentenceTransformerBackend {
    fn name(&self) -> &'static str {
        "st"
    }

    async fn analyze_page(&self, _page: &AnalyzedPage) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn embed_page(&self, page: &AnalyzedPage) -> Result<Option<Vec<f64>>> {
        if page.clean_text.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.embedder.embed(&page.clean_text).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!(" TextRank ".parse::<BackendKind>().unwrap(), BackendKind::TextRank);
    }

    #[test]
    fn test_backend_kind_unknown() {
        let err = "spacy".parse::<BackendKind>().unwrap_err();
        assert!(err.to_string().contains("naive, textrank, tfidf, eatopics, st"));
    }

    fn page(html: &str) -> AnalyzedPage {
        let content = ContentExtractor::default().extract(html).unwrap();
        let clean_text = crate::content::text::preprocess(&content.text, MAX_INPUT_LENGTH);
        AnalyzedPage {
            url: "https://example.com/post".to_string(),
            language: crate::language::detect_language(&content.text),
            content,
            clean_text,
        }
    }

    #[tokio::test]
    async fn test_textrank_phrases_stop_at_sentence_ends() {
        let page = page(
            "<body><p>Teams deploy docker. Kubernetes schedules docker containers. Docker. \
             Kubernetes clusters scale docker. Docker. Kubernetes.</p></body>",
        );
        let keywords = TextRankBackend::default().analyze_page(&page).await.unwrap();

        assert!(!keywords.is_empty());
        // "docker. kubernetes" only ever meet across a period
        assert!(keywords.iter().all(|k| !k.contains("docker kubernetes")));
        for keyword in &keywords {
            let words: Vec<&str> = keyword.split(' ').collect();
            let unique: HashSet<&str> = words.iter().copied().collect();
            assert_eq!(words.len(), unique.len(), "repeated word in '{keyword}'");
        }
    }

    #[tokio::test]
    async fn test_tfidf_ranks_over_paragraphs() {
        let page = page(
            "<body><p>Kubernetes schedules pods. Kubernetes restarts pods. Kubernetes scales.</p>\
             <p>Terraform provisions cloud networks and storage buckets.</p></body>",
        );
        assert_eq!(page.content.blocks.len(), 2);

        let keywords = TfIdfBackend::default().analyze_page(&page).await.unwrap();
        assert_eq!(keywords.first().map(String::as_str), Some("kubernetes"));
        assert!(keywords.iter().all(|k| k == &k.to_lowercase()));
    }

    #[tokio::test]
    async fn test_tfidf_empty_page_has_no_keywords() {
        let page = page("<body><nav>menu</nav></body>");
        assert!(TfIdfBackend::default().analyze_page(&page).await.unwrap().is_empty());
    }

    #[test]
    fn test_ranked_terms_dedupes_and_lowercases() {
        let keywords = vec![
            ScoredKeyword::new("Rust", 3.0),
            ScoredKeyword::new("rust", 2.0),
            ScoredKeyword::new("  ", 1.5),
            ScoredKeyword::new("cargo", 1.0),
        ];
        assert_eq!(ranked_terms(keywords), vec!["rust", "cargo"]);
    }
}
