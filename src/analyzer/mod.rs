// Page analysis: fetch a URL, pull out its main content, and run a backend.
//
// The Analyzer owns the whole per-URL flow so callers (the analyze task,
// re-analysis, similar-URL lookup) only deal with the outcome. A failed or
// non-2xx fetch is not an error: it yields an outcome with no keywords.

pub mod backends;
pub mod traits;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::classifier::models::{
    embedding_files_present, embedding_model_dir, topic_model_dir,
};
use crate::classifier::onnx::OnnxTopicClassifier;
use crate::content::text::{preprocess, MAX_INPUT_LENGTH};
use crate::fetch::traits::PageFetcher;
use crate::language::{detect_language, LanguageGuess};
use crate::topics::embeddings::SentenceEmbedder;
use crate::topics::traits::TextEmbedder;

use backends::{
    BackendKind, NaiveBackend, SentenceTransformerBackend, TextRankBackend, TfIdfBackend,
    TopicModelBackend,
};
use traits::{AnalyzedPage, AnalyzerBackend};

/// The result of analyzing one URL.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub url: String,
    /// `None` when the page could not be fetched or was not a 2xx
    pub keywords: Option<Vec<String>>,
    pub embedding: Option<Vec<f64>>,
    pub language: Option<LanguageGuess>,
    pub title: Option<String>,
}

pub struct Analyzer {
    fetcher: Arc<dyn PageFetcher>,
    backend: Box<dyn AnalyzerBackend>,
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl Analyzer {
    pub fn new(fetcher: Arc<dyn PageFetcher>, backend: Box<dyn AnalyzerBackend>) -> Self {
        Self {
            fetcher,
            backend,
            embedder: None,
        }
    }

    /// Also embed every analyzed page with `embedder`, whatever the backend.
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether analyzed pages will carry embeddings.
    pub fn embeds(&self) -> bool {
        self.embedder.is_some() || self.backend.name() == BackendKind::SentenceTransformer.as_str()
    }

    /// Fetch and analyze a URL.
    pub async fn analyze(&self, url: &str) -> Result<AnalysisOutcome> {
        let mut outcome = AnalysisOutcome {
            url: url.to_string(),
            ..AnalysisOutcome::default()
        };

        let page = match self.fetcher.fetch(url).await {
            Some(page) if page.is_success() => page,
            Some(page) => {
                debug!(url = url, status = page.status, "Not analyzing non-success response");
                return Ok(outcome);
            }
            None => {
                debug!(url = url, "Not analyzing unreachable page");
                return Ok(outcome);
            }
        };

        let Some(content) = self.backend.extractor().extract(&page.body) else {
            debug!(url = url, "No main content found");
            outcome.keywords = Some(Vec::new());
            return Ok(outcome);
        };

        let language = detect_language(&content.text);
        let clean_text = preprocess(&content.text, MAX_INPUT_LENGTH);
        outcome.title = content.title.clone();
        outcome.language = language;

        let analyzed = AnalyzedPage {
            url: url.to_string(),
            content,
            clean_text,
            language,
        };

        let keywords = self.backend.analyze_page(&analyzed).await?;
        validate_keywords(&keywords)?;

        let embedding = match &self.embedder {
            Some(embedder) if !analyzed.clean_text.is_empty() => {
                Some(embedder.embed(&analyzed.clean_text).await?)
            }
            Some(_) => None,
            None => self.backend.embed_page(&analyzed).await?,
        };

        info!(
            url = url,
            backend = self.backend.name(),
            keywords = ?keywords,
            language = analyzed.language.as_ref().map(|g| g.language.code()).unwrap_or("unknown"),
            embedded = embedding.is_some(),
            "Analyzed page"
        );

        outcome.keywords = Some(keywords);
        outcome.embedding = embedding;
        Ok(outcome)
    }
}

/// Keywords must be non-empty lowercase strings.
pub fn validate_keywords(keywords: &[String]) -> Result<()> {
    for keyword in keywords {
        if keyword.trim().is_empty() {
            anyhow::bail!("Keywords must not be blank: {:?}", keywords);
        }
        if *keyword != keyword.to_lowercase() {
            anyhow::bail!("Keywords must be lowercase, got '{}'", keyword);
        }
    }
    Ok(())
}

/// Load the sentence embedder if its files are on disk.
pub fn load_embedder(model_dir: &Path, st_home: Option<&Path>) -> Result<Option<Arc<dyn TextEmbedder>>> {
    let dir = embedding_model_dir(model_dir, st_home);
    if !embedding_files_present(&dir) {
        return Ok(None);
    }
    let embedder: Arc<dyn TextEmbedder> = Arc::new(SentenceEmbedder::load(&dir)?);
    Ok(Some(embedder))
}

/// Build the backend named by `kind`, loading models as needed.
pub fn build_backend(
    kind: BackendKind,
    model_dir: &Path,
    st_home: Option<&Path>,
) -> Result<Box<dyn AnalyzerBackend>> {
    let backend: Box<dyn AnalyzerBackend> = match kind {
        BackendKind::Naive => Box::new(NaiveBackend::default()),
        BackendKind::TextRank => Box::new(TextRankBackend::default()),
        BackendKind::TfIdf => Box::new(TfIdfBackend::default()),
        BackendKind::Topics => {
            let classifier = OnnxTopicClassifier::load(&topic_model_dir(model_dir))?;
            Box::new(TopicModelBackend::new(Arc::new(classifier)))
        }
        BackendKind::SentenceTransformer => {
            let dir = embedding_model_dir(model_dir, st_home);
            let embedder = SentenceEmbedder::load(&dir)?;
            Box::new(SentenceTransformerBackend::new(Arc::new(embedder)))
        }
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_keywords() {
        assert!(validate_keywords(&[]).is_ok());
        assert!(validate_keywords(&["python".to_string(), "machine learning".to_string()]).is_ok());
        assert!(validate_keywords(&["Python".to_string()]).is_err());
        assert!(validate_keywords(&["".to_string()]).is_err());
    }

    #[test]
    fn test_build_keyword_backends_without_models() {
        let dir = std::env::temp_dir().join("topical-no-models");
        for kind in [BackendKind::Naive, BackendKind::TextRank, BackendKind::TfIdf] {
            let backend = build_backend(kind, &dir, None).unwrap();
            assert_eq!(backend.name(), kind.as_str());
        }
    }

    #[test]
    fn test_model_backends_need_model_files() {
        let dir = std::env::temp_dir().join("topical-no-models");
        assert!(build_backend(BackendKind::Topics, &dir, None).is_err());
        assert!(build_backend(BackendKind::SentenceTransformer, &dir, None).is_err());
        assert!(load_embedder(&dir, None).unwrap().is_none());
    }
}
