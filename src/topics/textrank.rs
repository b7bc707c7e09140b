// TextRank keyword extraction.
//
// Candidate words (no stop words, no numbers, at least two characters) become
// nodes in an undirected co-occurrence graph: two candidates are linked when
// they appear within `window_size` positions of each other in the candidate
// sequence, weighted by how often that happens. Weighted PageRank over the
// graph ranks the words. Adjacent top-ranked words are then merged back into
// keyphrases scored by the sum of their word scores.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use tracing::debug;

use super::traits::{KeywordExtractor, ScoredKeyword};
use crate::language::Language;

/// Graph-ranking keyword extractor.
#[derive(Debug, Clone)]
pub struct TextRankExtractor {
    /// How many keyterms to return
    pub top_n: usize,
    /// Co-occurrence window, in candidate positions
    pub window_size: usize,
    pub damping: f64,
    /// Convergence threshold on the largest per-node score change
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Longest keyphrase, in words
    pub max_phrase_words: usize,
}

impl Default for TextRankExtractor {
    fn default() -> Self {
        Self {
            top_n: 10,
            window_size: 2,
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
            max_phrase_words: 3,
        }
    }
}

/// One position of the tokenized text: a word, or a break at punctuation.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Word(String),
    Break,
}

impl TextRankExtractor {
    /// Rank candidate words by TextRank score, highest first (ties alphabetical).
    pub fn rank_words(&self, text: &str, language: Language) -> Vec<(String, f64)> {
        let slots = tokenize(text);
        let stop_words = language.stop_words();
        let candidates: Vec<&str> = slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Word(w) if is_candidate(w, stop_words) => Some(w.as_str()),
                _ => None,
            })
            .collect();

        let scores = self.pagerank(&candidates);
        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Weighted PageRank over the co-occurrence graph of `sequence`.
    fn pagerank(&self, sequence: &[&str]) -> BTreeMap<String, f64> {
        // Node ids in first-seen order keep iteration deterministic
        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut names: Vec<&str> = Vec::new();
        for &word in sequence {
            if !ids.contains_key(word) {
                ids.insert(word, names.len());
                names.push(word);
            }
        }

        let n = names.len();
        if n == 0 {
            return BTreeMap::new();
        }

        let mut weights: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let window = self.window_size.max(2);
        for (i, a) in sequence.iter().enumerate() {
            for b in sequence.iter().skip(i + 1).take(window - 1) {
                let (ia, ib) = (ids[a], ids[b]);
                if ia == ib {
                    continue;
                }
                *weights[ia].entry(ib).or_insert(0.0) += 1.0;
                *weights[ib].entry(ia).or_insert(0.0) += 1.0;
            }
        }

        let out_weight: Vec<f64> = weights.iter().map(|edges| edges.values().sum()).collect();
        let base = (1.0 - self.damping) / n as f64;
        let mut scores = vec![1.0 / n as f64; n];

        for iteration in 0..self.max_iterations {
            let mut next = vec![base; n];
            for (j, edges) in weights.iter().enumerate() {
                if out_weight[j] <= 0.0 {
                    continue;
                }
                for (&i, &w) in edges {
                    next[i] += self.damping * (w / out_weight[j]) * scores[j];
                }
            }

            let delta = next
                .iter()
                .zip(scores.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);
            scores = next;

            if delta < self.tolerance {
                debug!(iterations = iteration + 1, nodes = n, "TextRank converged");
                break;
            }
        }

        names
            .into_iter()
            .zip(scores)
            .map(|(name, score)| (name.to_string(), score))
            .collect()
    }
}

impl KeywordExtractor for TextRankExtractor {
    fn extract(&self, text: &str, language: Language) -> Result<Vec<ScoredKeyword>> {
        let ranked = self.rank_words(text, language);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let keep = ranked.len().div_ceil(3).max(1);
        let top: HashMap<&str, f64> = ranked
            .iter()
            .take(keep)
            .map(|(w, s)| (w.as_str(), *s))
            .collect();

        let stop_words = language.stop_words();
        let mut phrases: HashMap<String, f64> = HashMap::new();
        let mut run: Vec<&str> = Vec::new();

        let slots = tokenize(text);
        for slot in slots.iter().chain(std::iter::once(&Slot::Break)) {
            match slot {
                Slot::Word(w) if is_candidate(w, stop_words) && top.contains_key(w.as_str()) => {
                    run.push(w.as_str());
                }
                _ => {
                    for chunk in run.chunks(self.max_phrase_words.max(1)) {
                        let term = chunk.join(" ");
                        let score: f64 = chunk.iter().map(|w| top[w]).sum();
                        phrases.insert(term, score);
                    }
                    run.clear();
                }
            }
        }

        let mut keyterms: Vec<ScoredKeyword> = phrases
            .into_iter()
            .map(|(term, score)| ScoredKeyword::new(term, score))
            .collect();
        keyterms.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.term.cmp(&b.term))
        });

        // A phrase already covers its words; drop single words it contains
        let multi_word: HashSet<String> = keyterms
            .iter()
            .filter(|k| k.term.contains(' '))
            .flat_map(|k| k.term.split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect();
        keyterms.retain(|k| k.term.contains(' ') || !multi_word.contains(&k.term));
        keyterms.truncate(self.top_n);

        Ok(keyterms)
    }
}

fn is_candidate(word: &str, stop_words: &HashSet<String>) -> bool {
    word.chars().count() >= 2
        && !word.chars().all(|c| c.is_numeric())
        && !stop_words.contains(word)
}

/// Split text into lowercase words, marking punctuation as phrase breaks.
/// Hyphens and apostrophes are allowed inside a word.
fn tokenize(text: &str) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, slots: &mut Vec<Slot>| {
        let word = current.trim_matches(|c: char| c == '-' || c == '\'');
        if !word.is_empty() {
            slots.push(Slot::Word(word.to_lowercase()));
        }
        current.clear();
    };

    for c in text.chars() {
        if c.is_alphanumeric() || ((c == '-' || c == '\'') && !current.is_empty()) {
            current.push(c);
        } else if c.is_whitespace() {
            flush(&mut current, &mut slots);
        } else {
            flush(&mut current, &mut slots);
            if slots.last() != Some(&Slot::Break) {
                slots.push(Slot::Break);
            }
        }
    }
    flush(&mut current, &mut slots);

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_word_ranks_first() {
        let extractor = TextRankExtractor::default();
        let text = "kubernetes schedules containers. kubernetes manages clusters. \
                    kubernetes stores etcd snapshots. docker builds containers.";
        let ranked = extractor.rank_words(text, Language::English);
        assert_eq!(ranked[0].0, "kubernetes");
    }

    #[test]
    fn test_adjacent_top_words_merge_into_phrase() {
        let extractor = TextRankExtractor::default();
        let text = "neural networks learn. neural networks generalize. neural networks overfit.";
        let keyterms = extractor.extract(text, Language::English).unwrap();
        assert_eq!(keyterms[0].term, "neural networks");
        // The phrase absorbs its words
        assert!(keyterms.iter().all(|k| k.term != "neural" && k.term != "networks"));
    }

    #[test]
    fn test_stop_words_and_numbers_excluded() {
        let extractor = TextRankExtractor::default();
        let ranked = extractor.rank_words("the 2024 release of the compiler and the 42 linker", Language::English);
        let words: Vec<&str> = ranked.iter().map(|(w, _)| w.as_str()).collect();
        assert!(!words.contains(&"the"));
        assert!(!words.contains(&"2024"));
        assert!(words.contains(&"compiler"));
    }

    #[test]
    fn test_scores_sorted_and_capped() {
        let extractor = TextRankExtractor {
            top_n: 3,
            ..TextRankExtractor::default()
        };
        let text = "rust compiler borrow checker lifetimes traits generics macros cargo crates \
                    rust compiler errors borrow checker rules cargo workspaces";
        let keyterms = extractor.extract(text, Language::English).unwrap();
        assert!(keyterms.len() <= 3);
        for pair in keyterms.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_deterministic() {
        let extractor = TextRankExtractor::default();
        let text = "graph ranking finds central words. central words connect many graph nodes.";
        let a = extractor.extract(text, Language::English).unwrap();
        let b = extractor.extract(text, Language::English).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text() {
        let extractor = TextRankExtractor::default();
        assert!(extractor.extract("", Language::English).unwrap().is_empty());
        assert!(extractor.extract("the and of", Language::English).unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_breaks_and_hyphens() {
        let slots = tokenize("Front-end, back-end; 'quoted'");
        assert_eq!(
            slots,
            vec![
                Slot::Word("front-end".to_string()),
                Slot::Break,
                Slot::Word("back-end".to_string()),
                Slot::Break,
                Slot::Word("quoted".to_string()),
            ]
        );
    }
}
