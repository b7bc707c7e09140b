// Text preprocessing: the normalization pipeline applied before keyword
// extraction, language detection and embedding.
//
// Pipeline order matters: NFKC first so full-width punctuation and ligatures
// collapse to their ASCII forms, then punctuation becomes whitespace, then
// whitespace runs collapse, then lowercase, then truncate.

use unicode_normalization::UnicodeNormalization;

/// Cap on the preprocessed text handed to models (in characters).
pub const MAX_INPUT_LENGTH: usize = 100_000;

/// ASCII punctuation minus the hyphen, matching what the ad client strips
/// from words before counting them.
const PUNCTUATION_KEEP_HYPHEN: &str = r##"!"#$%&'()*+,./:;<=>?@[\]^_`{|}~"##;

/// Run the full normalization pipeline and cut the result to `max_chars`.
pub fn preprocess(text: &str, max_chars: usize) -> String {
    let normalized: String = text.nfkc().collect();
    let depunctuated: String = normalized
        .chars()
        .map(|c| if is_punctuation(c) { ' ' } else { c })
        .collect();
    let collapsed = collapse_whitespace(&depunctuated).to_lowercase();
    truncate_at_char(&collapsed, max_chars).to_string()
}

/// The pipeline without the punctuation step, for extractors that use
/// punctuation as phrase boundaries.
pub fn normalize_keep_punctuation(text: &str, max_chars: usize) -> String {
    let normalized: String = text.nfkc().collect();
    let collapsed = collapse_whitespace(&normalized).to_lowercase();
    truncate_at_char(&collapsed, max_chars).to_string()
}

/// Fold every whitespace run (newlines included) into a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove ASCII punctuation from a word, keeping hyphens.
pub fn strip_punctuation_keep_hyphen(word: &str) -> String {
    word.chars()
        .filter(|c| !PUNCTUATION_KEEP_HYPHEN.contains(*c))
        .collect()
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Respects UTF-8 boundaries, so it never panics on multi-byte characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Borrowing truncation without the ellipsis.
fn truncate_at_char(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Punctuation in the Unicode sense: ASCII punctuation plus the general
/// punctuation, CJK punctuation and Latin-1 quote/inverted-mark blocks.
/// Currency and math symbols are kept.
fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation() && !matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~');
    }
    matches!(
        c,
        '\u{00A1}' | '\u{00A7}' | '\u{00AB}' | '\u{00B6}' | '\u{00B7}' | '\u{00BB}' | '\u{00BF}'
            | '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{205E}'
            | '\u{3001}'..='\u{3003}'
            | '\u{3008}'..='\u{3011}'
            | '\u{3014}'..='\u{301F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_pipeline() {
        let out = preprocess("Hello,   World!\nThis is\tRust.", MAX_INPUT_LENGTH);
        assert_eq!(out, "hello world this is rust");
    }

    #[test]
    fn test_preprocess_normalizes_fullwidth() {
        // Full-width letters and punctuation fold to ASCII under NFKC
        let out = preprocess("Ｒｕｓｔ！", MAX_INPUT_LENGTH);
        assert_eq!(out, "rust");
    }

    #[test]
    fn test_preprocess_keeps_symbols() {
        let out = preprocess("costs $5 + tax", MAX_INPUT_LENGTH);
        assert_eq!(out, "costs $5 + tax");
    }

    #[test]
    fn test_preprocess_truncates_on_char_boundary() {
        let out = preprocess("héllo wörld", 4);
        assert_eq!(out, "héll");
    }

    #[test]
    fn test_preprocess_smart_quotes_removed() {
        let out = preprocess("\u{201C}quoted\u{201D} text", MAX_INPUT_LENGTH);
        assert_eq!(out, "quoted text");
    }

    #[test]
    fn test_normalize_keeps_punctuation() {
        let out = normalize_keep_punctuation("Ｄｏｃｋｅｒ.  Front-end,\nRust！", MAX_INPUT_LENGTH);
        assert_eq!(out, "docker. front-end, rust!");
    }

    #[test]
    fn test_strip_punctuation_keeps_hyphen() {
        assert_eq!(strip_punctuation_keep_hyphen("(front-end)."), "front-end");
        assert_eq!(strip_punctuation_keep_hyphen("python's"), "pythons");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\t c "), "a b c");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("ééé", 2), "éé...");
    }
}
