// Naive keyword extractor: counts corpus keywords in the first words of a page.
//
// This mirrors the ad client's own targeting so offline results line up with
// what the client computes in the browser. No linguistics, no language model:
// split on whitespace, strip punctuation (hyphens kept), lowercase, count.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use super::corpus::default_corpus;
use super::traits::{KeywordExtractor, ScoredKeyword};
use crate::content::text::strip_punctuation_keep_hyphen;
use crate::language::Language;

pub const MAX_WORDS_ANALYZED: usize = 1000;
pub const MAX_KEYWORDS: usize = 3;
pub const MIN_KEYWORD_OCCURRENCES: usize = 2;

/// Corpus-counting extractor.
pub struct NaiveExtractor {
    corpus: HashSet<String>,
    pub max_words_analyzed: usize,
    pub max_keywords: usize,
    pub min_occurrences: usize,
}

impl Default for NaiveExtractor {
    fn default() -> Self {
        Self::with_corpus(default_corpus())
    }
}

impl NaiveExtractor {
    pub fn with_corpus(corpus: HashSet<String>) -> Self {
        Self {
            corpus,
            max_words_analyzed: MAX_WORDS_ANALYZED,
            max_keywords: MAX_KEYWORDS,
            min_occurrences: MIN_KEYWORD_OCCURRENCES,
        }
    }

    /// Count corpus keywords and return the most common ones.
    ///
    /// Ties keep the order in which the keywords first appeared.
    pub fn count_keywords(&self, text: &str) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

        for (index, raw) in text.split_whitespace().enumerate() {
            // Index is checked after the fact, so word #max is still counted
            if index > self.max_words_analyzed {
                break;
            }

            let word = strip_punctuation_keep_hyphen(raw).to_lowercase();
            if self.corpus.contains(&word) {
                let next_order = counts.len();
                counts.entry(word).or_insert((0, next_order)).0 += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .filter(|(_, (count, _))| *count >= self.min_occurrences)
            .map(|(word, (count, order))| (word, count, order))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(self.max_keywords)
            .map(|(word, count, _)| (word, count))
            .collect()
    }
}

impl KeywordExtractor for NaiveExtractor {
    fn extract(&self, text: &str, _language: Language) -> Result<Vec<ScoredKeyword>> {
        Ok(self
            .count_keywords(text)
            .into_iter()
            .map(|(word, count)| ScoredKeyword::new(word, count as f64))
            .collect())
    }
}
