// Requirement manifests: the pinned dependency lists that define the
// analyzer's installation tiers.
//
// A manifest is grouped into sections by comment headers. Sections whose
// header mentions machine learning, production or a model belong to the
// heavyweight tier; everything else is the base analyzer tier. Manifests can
// be checked for well-formedness, resolved against a package index, and
// have their direct download URLs verified.

pub mod parse;
pub mod resolve;
pub mod specifier;
pub mod version;

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use specifier::VersionSpec;
use version::Version;

pub use resolve::{PackageIndex, ResolvedPackage, Resolution, UrlCheck};

/// Installation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tier {
    /// Lightweight analyzer dependencies
    Base,
    /// Model-bearing production dependencies (large downloads)
    MachineLearning,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Base => write!(f, "base"),
            Tier::MachineLearning => write!(f, "machine-learning"),
        }
    }
}

/// One package requirement line.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// Name as written
    pub name: String,
    pub extras: Vec<String>,
    pub spec: VersionSpec,
    /// Direct download URL, for `name @ url` and bare URL lines
    pub url: Option<String>,
    /// Version taken from a wheel file name in `url`
    pub url_version: Option<Version>,
    /// Environment marker, verbatim
    pub marker: Option<String>,
    /// 1-based line number
    pub line: usize,
    /// Comment directly above or after the line
    pub note: Option<String>,
}

impl Requirement {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn direct_url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        match &self.url {
            Some(url) => write!(f, " @ {url}")?,
            None => write!(f, "{}", self.spec)?,
        }
        if let Some(marker) = &self.marker {
            write!(f, " ; {marker}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Requirement(Requirement),
    /// Option lines like `-r base.txt` or `--index-url ...`, kept verbatim
    Directive { line: usize, text: String },
}

/// A commented group of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    pub tier: Tier,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Requirement(requirement) => Some(requirement),
            Entry::Directive { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub sections: Vec<Section>,
}

impl Manifest {
    /// Parse manifest text. Errors name the offending line.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            sections: parse::parse_sections(text)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Every requirement, in file order.
    pub fn requirements(&self) -> Vec<&Requirement> {
        self.sections.iter().flat_map(|s| s.requirements()).collect()
    }

    /// Requirements belonging to one tier.
    pub fn tier(&self, tier: Tier) -> Vec<&Requirement> {
        self.sections
            .iter()
            .filter(|s| s.tier == tier)
            .flat_map(|s| s.requirements())
            .collect()
    }

    pub fn directives(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.entries.iter())
            .filter_map(|entry| match entry {
                Entry::Directive { text, .. } => Some(text.as_str()),
                Entry::Requirement(_) => None,
            })
            .collect()
    }

    /// Requirements installed from a direct URL.
    pub fn direct_urls(&self) -> Vec<&Requirement> {
        self.requirements()
            .into_iter()
            .filter(|r| r.url.is_some())
            .collect()
    }

    /// Look up a requirement by (normalized) name.
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = normalize_name(name);
        self.requirements()
            .into_iter()
            .find(|r| r.normalized_name() == wanted)
    }
}

/// Canonical package name: lowercase, with runs of `-`, `_` and `.` folded to `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Sentence_Transformers"), "sentence-transformers");
        assert_eq!(normalize_name("en_core_web_md"), "en-core-web-md");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("a-_.b"), "a-b");
    }

    #[test]
    fn test_sections_and_tiers() {
        let text = "\
# Keyword and topic analyzer
textacy==0.13.0
# networkx 3 breaks textacy's graph code
networkx<3.0

# Machine learning production requirements
# Large downloads
sentence-transformers==2.2.2
";
        let manifest = Manifest::parse(text).unwrap();
        assert_eq!(manifest.sections.len(), 2);
        assert_eq!(manifest.sections[0].tier, Tier::Base);
        assert_eq!(manifest.sections[1].tier, Tier::MachineLearning);
        assert_eq!(
            manifest.sections[1].title.as_deref(),
            Some("Machine learning production requirements Large downloads")
        );

        let base: Vec<&str> = manifest.tier(Tier::Base).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(base, vec!["textacy", "networkx"]);
        assert_eq!(
            manifest.get("NetworkX").and_then(|r| r.note.as_deref()),
            Some("networkx 3 breaks textacy's graph code")
        );
    }

    #[test]
    fn test_untitled_manifest_is_base() {
        let manifest = Manifest::parse("requests==2.31.0\n-r other.txt\n").unwrap();
        assert_eq!(manifest.sections.len(), 1);
        assert_eq!(manifest.tier(Tier::Base).len(), 1);
        assert_eq!(manifest.directives(), vec!["-r other.txt"]);
    }

    #[test]
    fn test_parse_error_has_line_number() {
        let err = Manifest::parse("# header\ntextacy==0.13.0\nspacy=3.7\n").unwrap_err();
        assert!(err.to_string().starts_with("line 3"), "got: {err}");
    }

    #[test]
    fn test_requirement_display() {
        let manifest = Manifest::parse("spacy[lookups]>=3.7,<3.8 ; python_version >= \"3.9\"\n").unwrap();
        assert_eq!(
            manifest.requirements()[0].to_string(),
            "spacy[lookups]>=3.7,<3.8 ; python_version >= \"3.9\""
        );
    }
}
