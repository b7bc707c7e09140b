// Language detection from stop-word profiles.
//
// Each supported language has a stop-word list (from the stop-words crate).
// A token found in several lists counts fractionally toward each of them, so
// words that are unique to one language carry the most signal. The language
// with the highest score wins.

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};

/// Texts with fewer words than this are not classified.
pub const MIN_WORDS: usize = 5;

/// The winning language needs at least this many stop-word hits.
pub const MIN_STOP_WORD_HITS: usize = 2;

/// Languages the analyzer can detect and has stop words for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Portuguese,
    Italian,
    Dutch,
}

impl Language {
    /// All supported languages, in tie-break order.
    pub const ALL: [Language; 7] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Portuguese,
        Language::Italian,
        Language::Dutch,
    ];

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Portuguese => "pt",
            Language::Italian => "it",
            Language::Dutch => "nl",
        }
    }

    /// Stop words for this language, lowercase.
    pub fn stop_words(&self) -> &'static HashSet<String> {
        &stop_word_table()[self.index()]
    }

    fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|lang| lang == self)
            .unwrap_or_default()
    }

    fn stop_words_source(&self) -> LANGUAGE {
        match self {
            Language::English => LANGUAGE::English,
            Language::Spanish => LANGUAGE::Spanish,
            Language::French => LANGUAGE::French,
            Language::German => LANGUAGE::German,
            Language::Portuguese => LANGUAGE::Portuguese,
            Language::Italian => LANGUAGE::Italian,
            Language::Dutch => LANGUAGE::Dutch,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Result of language detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageGuess {
    pub language: Language,
    /// Share of the total stop-word score that went to the winner (0.0 to 1.0)
    pub confidence: f64,
    /// Raw number of tokens found in the winner's stop-word list
    pub stop_word_hits: usize,
}

fn stop_word_table() -> &'static Vec<HashSet<String>> {
    static TABLE: OnceLock<Vec<HashSet<String>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        Language::ALL
            .iter()
            .map(|lang| {
                get(lang.stop_words_source())
                    .into_iter()
                    .map(|w| w.to_lowercase())
                    .collect()
            })
            .collect()
    })
}

/// Split text into lowercase word tokens (letters, digits and inner apostrophes).
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Guess the language of a text. Returns `None` for short or ambiguous text.
pub fn detect_language(text: &str) -> Option<LanguageGuess> {
    let tokens = word_tokens(text);
    if tokens.len() < MIN_WORDS {
        return None;
    }

    let table = stop_word_table();
    let mut scores = [0.0_f64; Language::ALL.len()];
    let mut hits = [0usize; Language::ALL.len()];

    for token in &tokens {
        let owners: Vec<usize> = table
            .iter()
            .enumerate()
            .filter(|(_, words)| words.contains(token))
            .map(|(i, _)| i)
            .collect();
        if owners.is_empty() {
            continue;
        }
        let share = 1.0 / owners.len() as f64;
        for i in owners {
            scores[i] += share;
            hits[i] += 1;
        }
    }

    let total: f64 = scores.iter().sum();
    if total <= 0.0 {
        return None;
    }

    // Strictly greater keeps the earliest language on ties
    let mut best = 0;
    for i in 1..scores.len() {
        if scores[i] > scores[best] {
            best = i;
        }
    }

    if hits[best] < MIN_STOP_WORD_HITS {
        return None;
    }

    Some(LanguageGuess {
        language: Language::ALL[best],
        confidence: (scores[best] / total).clamp(0.0, 1.0),
        stop_word_hits: hits[best],
    })
}
