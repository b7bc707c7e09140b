// Line grammar for requirement manifests.
//
//   # comment                         full-line comment
//   name==1.0  # note                 trailing comment
//   name[extra1,extra2]>=1.0,<2       extras and constraint list
//   name @ https://host/pkg.whl       named direct URL
//   https://host/pkg-1.0-py3-none-any.whl   bare direct URL (name from the wheel)
//   name>=1.0 ; python_version >= "3.8"     environment marker, kept verbatim
//   -r other.txt / --index-url ...    option directives
//
// Comment blocks separated from the previous entries by a blank line start
// a new section; comment lines directly above an entry are notes on it.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex_lite::Regex;

use super::specifier::VersionSpec;
use super::version::Version;
use super::{Entry, Requirement, Section, Tier};

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$")
            .expect("requirement name regex is valid")
    })
}

/// Split off a trailing comment. A `#` only starts a comment at the start of
/// the line or after whitespace, so URL fragments survive.
pub(crate) fn strip_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            let comment = line[i + 1..].trim();
            return (line[..i].trim_end(), Some(comment));
        }
    }
    (line.trim_end(), None)
}

fn is_url(text: &str) -> bool {
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| text.to_ascii_lowercase().starts_with(scheme))
}

/// Split an environment marker off a requirement.
///
/// After a URL the `;` must follow whitespace, since URLs may contain `;`.
fn split_marker(text: &str, after_url: bool) -> (&str, Option<String>) {
    let position = if after_url {
        text.find(" ;").map(|i| i + 1)
    } else {
        text.find(';')
    };
    match position {
        Some(i) => (text[..i].trim(), Some(text[i + 1..].trim().to_string())),
        None => (text.trim(), None),
    }
}

/// Name and version from a wheel filename: `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`.
pub fn wheel_name_version(filename: &str) -> Option<(String, Version)> {
    let stem = filename.strip_suffix(".whl")?;
    let parts: Vec<&str> = stem.split('-').collect();
    if parts.len() < 5 {
        return None;
    }
    let version = parts[1].parse().ok()?;
    Some((parts[0].to_string(), version))
}

/// Last path segment of a URL, without query or fragment.
pub fn url_filename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Package name from an `#egg=name` fragment.
fn egg_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .fragment()?
        .split('&')
        .find_map(|part| part.strip_prefix("egg="))
        .map(str::to_string)
}

fn parse_extras(text: &str) -> Result<Vec<String>> {
    let mut extras = Vec::new();
    for extra in text.split(',').map(str::trim) {
        if extra.is_empty() {
            continue;
        }
        if !extra.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c)) {
            anyhow::bail!("Invalid extra '{}'", extra);
        }
        extras.push(extra.to_string());
    }
    Ok(extras)
}

/// Parse a bare direct-URL line.
fn parse_bare_url(text: &str, line: usize) -> Result<Requirement> {
    let (url, marker) = split_marker(text, true);
    let filename = url_filename(url).with_context(|| format!("URL has no file name: {url}"))?;

    let (name, version) = match wheel_name_version(&filename) {
        Some((name, version)) => (name, Some(version)),
        None => {
            let name = egg_name(url).with_context(|| {
                format!("Cannot tell the package name of {url}: not a wheel and no #egg= fragment")
            })?;
            (name, None)
        }
    };

    Ok(Requirement {
        name,
        extras: Vec::new(),
        spec: VersionSpec::default(),
        url: Some(url.to_string()),
        url_version: version,
        marker,
        line,
        note: None,
    })
}

/// Parse a `name[extras] spec ; marker` or `name[extras] @ url ; marker` line.
fn parse_named(text: &str, line: usize) -> Result<Requirement> {
    let caps = name_regex()
        .captures(text)
        .with_context(|| format!("Invalid requirement '{text}'"))?;

    let name = caps["name"].to_string();
    let extras = match caps.name("extras") {
        Some(m) => parse_extras(m.as_str())?,
        None => Vec::new(),
    };
    let rest = caps.name("rest").map(|m| m.as_str().trim()).unwrap_or("");

    if let Some(url_part) = rest.strip_prefix('@') {
        let (url, marker) = split_marker(url_part.trim(), true);
        if !is_url(url) {
            anyhow::bail!("Expected a URL after '@', got '{}'", url);
        }
        let url_version = url_filename(url)
            .and_then(|filename| wheel_name_version(&filename))
            .map(|(_, version)| version);
        return Ok(Requirement {
            name,
            extras,
            spec: VersionSpec::default(),
            url: Some(url.to_string()),
            url_version,
            marker,
            line,
            note: None,
        });
    }

    let (spec_text, marker) = split_marker(rest, false);
    let spec_text = spec_text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(spec_text);
    let spec: VersionSpec = spec_text
        .parse()
        .with_context(|| format!("Invalid version constraint for {name}"))?;

    Ok(Requirement {
        name,
        extras,
        spec,
        url: None,
        url_version: None,
        marker,
        line,
        note: None,
    })
}

/// Parse one non-comment, non-directive line.
pub fn parse_requirement(text: &str, line: usize) -> Result<Requirement> {
    if is_url(text) {
        parse_bare_url(text, line)
    } else {
        parse_named(text, line)
    }
}

/// The tier a section title implies, if it names one.
pub fn tier_for_title(title: &str) -> Option<Tier> {
    let lower = title.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let machine_learning = lower.contains("machine learning")
        || words
            .iter()
            .any(|w| matches!(*w, "ml" | "production" | "model"));
    machine_learning.then_some(Tier::MachineLearning)
}

/// Parse a whole manifest into sections.
pub fn parse_sections(text: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = vec![Section {
        title: None,
        tier: Tier::Base,
        entries: Vec::new(),
    }];
    let mut comments: Vec<String> = Vec::new();
    // Whether the pending comment block began after a blank line (or at the top)
    let mut block_after_gap = true;
    let mut previous_blank = true;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let (content, comment) = strip_comment(raw);
        let content = content.trim();

        if content.is_empty() {
            match comment {
                Some(comment) => {
                    if comments.is_empty() {
                        block_after_gap = previous_blank;
                    }
                    comments.push(comment.to_string());
                    previous_blank = false;
                }
                None => {
                    // A comment block followed by a blank line still heads what comes next
                    previous_blank = true;
                }
            }
            continue;
        }

        let note = if comments.is_empty() {
            None
        } else {
            let block = comments.join(" ");
            comments.clear();
            if block_after_gap {
                let inherited = sections.last().map(|s| s.tier).unwrap_or(Tier::Base);
                let tier = tier_for_title(&block).unwrap_or(inherited);
                if sections.last().is_some_and(|s| s.entries.is_empty() && s.title.is_none()) {
                    sections.pop();
                }
                sections.push(Section {
                    title: Some(block),
                    tier,
                    entries: Vec::new(),
                });
                None
            } else {
                Some(block)
            }
        };
        previous_blank = false;

        let entry = if content.starts_with('-') {
            Entry::Directive {
                line,
                text: content.to_string(),
            }
        } else {
            let mut requirement =
                parse_requirement(content, line).with_context(|| format!("line {line}: {}", raw.trim()))?;
            requirement.note = match (note, comment) {
                (Some(above), Some(trailing)) => Some(format!("{above} {trailing}")),
                (above, trailing) => above.or(trailing.map(str::to_string)),
            };
            Entry::Requirement(requirement)
        };

        if let Some(section) = sections.last_mut() {
            section.entries.push(entry);
        }
    }

    sections.retain(|s| !s.entries.is_empty() || s.title.is_some());
    Ok(sections)
}
