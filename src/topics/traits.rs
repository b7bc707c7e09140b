// Extractor and embedder traits: swap-ready abstractions.
//
// Keyword extraction strategies (corpus counting, TextRank, TF-IDF) share the
// KeywordExtractor interface so analyzer backends can hold any of them. The
// TextEmbedder trait does the same for sentence embedding models, which also
// lets tests substitute a deterministic embedder for the ONNX one.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// A keyword or keyphrase with the score its extractor assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub term: String,
    pub score: f64,
}

impl ScoredKeyword {
    pub fn new(term: impl Into<String>, score: f64) -> Self {
        Self {
            term: term.into(),
            score,
        }
    }
}

/// Trait for extracting ranked keywords from a page's text.
pub trait KeywordExtractor: Send + Sync {
    /// Analyze text and return keywords, highest score first.
    fn extract(&self, text: &str, language: Language) -> Result<Vec<ScoredKeyword>>;
}

/// Trait for turning texts into dense vectors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed each text, returning vectors in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            anyhow::bail!("Embedder returned no vector");
        }
        Ok(vectors.remove(0))
    }
}
