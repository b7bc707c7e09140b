// TF-IDF keyword extraction.
//
// Uses the `keyword_extraction` crate over the blocks of a single page. Each
// paragraph (or sentence, when the page has no paragraph breaks) is treated as
// a separate document for IDF computation: words that appear in every block
// get downweighted, while words concentrated in a few blocks get boosted.

use anyhow::Result;
use keyword_extraction::tf_idf::{TfIdf, TfIdfParams};
use tracing::info;

use super::traits::{KeywordExtractor, ScoredKeyword};
use crate::language::Language;

/// Statistics-based keyword extractor.
pub struct TfIdfExtractor {
    /// How many top keywords to return
    pub top_n: usize,
}

impl Default for TfIdfExtractor {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl TfIdfExtractor {
    /// Rank keywords over a page already split into blocks (paragraphs,
    /// headings, list items). Falls back to sentences when there are fewer
    /// than two blocks.
    pub fn extract_blocks(&self, blocks: &[String], language: Language) -> Result<Vec<ScoredKeyword>> {
        self.rank_documents(&documents_from_blocks(blocks), language)
    }

    fn rank_documents(&self, documents: &[String], language: Language) -> Result<Vec<ScoredKeyword>> {
        if documents.is_empty() {
            anyhow::bail!("No text to analyze, cannot rank TF-IDF keywords");
        }

        let stop_words: Vec<String> = language.stop_words().iter().cloned().collect();

        let params = TfIdfParams::UnprocessedDocuments(documents, &stop_words, None);
        let tfidf = TfIdf::new(params);
        let ranked: Vec<(String, f32)> = tfidf.get_ranked_word_scores(self.top_n);

        if let Some((top_keyword, top_score)) = ranked.first() {
            info!(
                keywords = ranked.len(),
                documents = documents.len(),
                top_keyword = top_keyword.as_str(),
                top_score = *top_score,
                "Extracted TF-IDF keywords"
            );
        }

        Ok(ranked
            .into_iter()
            .map(|(word, score)| ScoredKeyword::new(word.to_lowercase(), score as f64))
            .collect())
    }
}

impl KeywordExtractor for TfIdfExtractor {
    fn extract(&self, text: &str, language: Language) -> Result<Vec<ScoredKeyword>> {
        self.rank_documents(&split_documents(text), language)
    }
}

/// Split plain text into TF-IDF documents: blank-line separated paragraphs
/// when there are at least two, sentences otherwise.
pub fn split_documents(text: &str) -> Vec<String> {
    let paragraphs: Vec<String> = text.split("\n\n").map(str::to_string).collect();
    documents_from_blocks(&paragraphs)
}

/// Non-empty blocks when there are at least two, otherwise the sentences of
/// the whole text.
pub fn documents_from_blocks(blocks: &[String]) -> Vec<String> {
    let blocks: Vec<String> = blocks
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect();
    if blocks.len() >= 2 {
        return blocks;
    }

    blocks
        .iter()
        .flat_map(|b| b.split(['.', '!', '?', '\n']))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic() {
        let extractor = TfIdfExtractor { top_n: 5 };
        let text = "Docker images package applications. \
                    Kubernetes schedules docker containers across clusters. \
                    Terraform provisions cloud infrastructure. \
                    Helm charts template kubernetes manifests.";

        let keywords = extractor.extract(text, Language::English).unwrap();
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= 5);
        assert!(keywords.iter().all(|k| k.term == k.term.to_lowercase()));
    }

    #[test]
    fn test_extract_empty_fails() {
        let extractor = TfIdfExtractor::default();
        assert!(extractor.extract("", Language::English).is_err());
        assert!(extractor.extract("   \n\n  ", Language::English).is_err());
    }

    #[test]
    fn test_split_documents_prefers_paragraphs() {
        let docs = split_documents("First para. Still first.\n\nSecond para.");
        assert_eq!(docs, vec!["First para. Still first.", "Second para."]);
    }

    #[test]
    fn test_blocks_are_documents() {
        let blocks = vec![
            "Alpha beta. Gamma delta.".to_string(),
            "  ".to_string(),
            "Epsilon zeta.".to_string(),
        ];
        assert_eq!(
            documents_from_blocks(&blocks),
            vec!["Alpha beta. Gamma delta.", "Epsilon zeta."]
        );

        let single = vec!["One sentence. Another one!".to_string()];
        assert_eq!(documents_from_blocks(&single), vec!["One sentence", "Another one"]);
    }

    #[test]
    fn test_split_documents_falls_back_to_sentences() {
        let docs = split_documents("One sentence. Another one! A question?");
        assert_eq!(docs, vec!["One sentence", "Another one", "A question"]);
    }
}
