// URL normalization for analyzed pages.
//
// The same page is often reached with search or campaign-tracking parameters
// attached. Those are stripped so one page maps to one analyzed URL record.

use anyhow::{Context, Result};
use url::{form_urlencoded, Url};

/// Query parameters that never change page content.
pub const IGNORED_QUERY_PARAMS: [&str; 10] = [
    "q",
    "query",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
];

/// Normalize a URL by removing ignored query parameters.
///
/// Remaining parameters keep their original order and are re-encoded; blank
/// values are kept. The `?` disappears when nothing is left. Everything outside
/// the query is returned exactly as given, so `https://example.com` gains no
/// trailing slash and host case is preserved.
pub fn normalize_url(raw: &str) -> Result<String> {
    Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;

    let (before_fragment, fragment) = match raw.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (raw, None),
    };
    let Some((base, query)) = before_fragment.split_once('?') else {
        return Ok(raw.to_string());
    };

    let kept: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !IGNORED_QUERY_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut normalized = base.to_string();
    if !kept.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        normalized.push('?');
        normalized.push_str(&encoded);
    }
    if let Some(fragment) = fragment {
        normalized.push('#');
        normalized.push_str(fragment);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_urls() {
        assert_eq!(
            normalize_url("https://example.com/path").unwrap(),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com/path?myparam=myval").unwrap(),
            "https://example.com/path?myparam=myval"
        );
        assert_eq!(
            normalize_url("https://example.com/#fragment").unwrap(),
            "https://example.com/#fragment"
        );
    }

    #[test]
    fn test_ignored_params_removed() {
        assert_eq!(
            normalize_url("https://example.com/path?q=myval").unwrap(),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com/path?q=myval&myparam=saved").unwrap(),
            "https://example.com/path?myparam=saved"
        );
        assert_eq!(
            normalize_url("https://example.com/a?utm_source=x&b=1&utm_medium=y#top").unwrap(),
            "https://example.com/a?b=1#top"
        );
    }

    #[test]
    fn test_blank_values_kept() {
        assert_eq!(
            normalize_url("https://example.com/?flag=&q=x").unwrap(),
            "https://example.com/?flag="
        );
    }

    #[test]
    fn test_bare_host_is_returned_as_given() {
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("https://example.com?q=x").unwrap(), "https://example.com");
        assert_eq!(
            normalize_url("https://Example.com/Path?utm_term=a&page=2").unwrap(),
            "https://Example.com/Path?page=2"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(normalize_url("not a url").is_err());
    }
}
