// Resolving a manifest against a package index, and checking direct URLs.
//
// Resolution is deterministic: packages are keyed by normalized name in a
// BTreeMap, exact pins must be available as-is, and ranges take the highest
// available version that satisfies every constraint on the package.
// Pre-releases are only chosen when the constraints name one or when nothing
// else fits. Dependencies of the listed packages are not expanded.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::specifier::VersionSpec;
use super::version::Version;
use super::{normalize_name, Manifest, Requirement};

/// Available versions per package, e.g. from `pip freeze` output or a mirror listing.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    packages: BTreeMap<String, BTreeSet<Version>>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, version: Version) {
        self.packages
            .entry(normalize_name(name))
            .or_default()
            .insert(version);
    }

    /// Parse `name==version` lines. Comments and blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut index = Self::new();
        for (i, raw) in text.lines().enumerate() {
            let (content, _) = super::parse::strip_comment(raw);
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let (name, version) = content
                .split_once("==")
                .with_context(|| format!("line {}: expected name==version, got '{}'", i + 1, content))?;
            let version: Version = version
                .trim()
                .parse()
                .with_context(|| format!("line {}: bad version for {}", i + 1, name.trim()))?;
            index.insert(name.trim(), version);
        }
        Ok(index)
    }

    pub fn versions(&self, name: &str) -> impl Iterator<Item = &Version> {
        self.packages.get(&normalize_name(name)).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Where a resolved package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Index,
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPackage {
    pub name: String,
    /// `None` for a direct URL whose file name carries no version
    pub version: Option<Version>,
    pub extras: Vec<String>,
    pub source: Source,
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        match (&self.source, &self.version) {
            (Source::Url(url), _) => write!(f, " @ {url}"),
            (Source::Index, Some(version)) => write!(f, "=={version}"),
            (Source::Index, None) => Ok(()),
        }
    }
}

/// The pinned set a manifest resolves to, keyed by normalized name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub packages: BTreeMap<String, ResolvedPackage>,
}

impl Resolution {
    /// Freeze-style listing, one package per line, sorted by name.
    pub fn to_lines(&self) -> Vec<String> {
        self.packages.values().map(|p| p.to_string()).collect()
    }
}

/// Requirements sharing a normalized name, merged.
struct Merged<'a> {
    first: &'a Requirement,
    spec: VersionSpec,
    extras: BTreeSet<String>,
    url: Option<&'a Requirement>,
}

impl Manifest {
    /// Resolve every requirement against `index`.
    pub fn resolve(&self, index: &PackageIndex) -> Result<Resolution> {
        resolve_requirements(&self.requirements(), index)
    }
}

/// Resolve a list of requirements against `index`.
pub fn resolve_requirements(requirements: &[&Requirement], index: &PackageIndex) -> Result<Resolution> {
    let mut merged: BTreeMap<String, Merged<'_>> = BTreeMap::new();
    for &requirement in requirements {
        let entry = merged
            .entry(requirement.normalized_name())
            .or_insert_with(|| Merged {
                first: requirement,
                spec: VersionSpec::default(),
                extras: BTreeSet::new(),
                url: None,
            });
        entry.spec = entry.spec.and(&requirement.spec);
        entry.extras.extend(requirement.extras.iter().cloned());
        if requirement.url.is_some() {
            if let Some(existing) = entry.url {
                if existing.url != requirement.url {
                    anyhow::bail!(
                        "{} is listed with two different URLs (lines {} and {})",
                        requirement.name,
                        existing.line,
                        requirement.line
                    );
                }
            }
            entry.url = Some(requirement);
        }
    }

    let mut resolution = Resolution::default();
    for (key, group) in merged {
        let extras: Vec<String> = group.extras.into_iter().collect();

        let package = match group.url {
            Some(url_req) => {
                if let Some(version) = &url_req.url_version {
                    if !group.spec.contains(version) {
                        anyhow::bail!(
                            "{} from {} is version {}, which does not satisfy {}",
                            url_req.name,
                            url_req.url.as_deref().unwrap_or_default(),
                            version,
                            group.spec
                        );
                    }
                }
                ResolvedPackage {
                    name: url_req.name.clone(),
                    version: url_req.url_version.clone(),
                    extras,
                    source: Source::Url(url_req.url.clone().unwrap_or_default()),
                }
            }
            None => {
                let version = pick_version(&group.first.name, &group.spec, index)?;
                ResolvedPackage {
                    name: group.first.name.clone(),
                    version: Some(version),
                    extras,
                    source: Source::Index,
                }
            }
        };

        debug!(package = key.as_str(), resolved = %package, "Resolved requirement");
        resolution.packages.insert(key, package);
    }

    Ok(resolution)
}

fn pick_version(name: &str, spec: &VersionSpec, index: &PackageIndex) -> Result<Version> {
    if let Some(pin) = spec.pinned() {
        return index
            .versions(name)
            .find(|v| *v == pin)
            .cloned()
            .with_context(|| format!("{name}=={pin} is not available in the index"));
    }

    let matching: Vec<&Version> = index.versions(name).filter(|v| spec.contains(v)).collect();
    let best_final = matching.iter().rev().find(|v| !v.is_prerelease());
    let chosen = if spec.mentions_prerelease() {
        matching.last()
    } else {
        best_final.or(matching.last())
    };

    chosen
        .map(|v| (*v).clone())
        .with_context(|| {
            let spec_text = if spec.is_empty() { "any version".to_string() } else { spec.to_string() };
            format!("No version of {name} satisfies {spec_text}")
        })
}

/// Result of checking one direct URL.
#[derive(Debug, Clone)]
pub struct UrlCheck {
    pub name: String,
    pub url: String,
    pub line: usize,
    /// HTTP status; `None` when the request failed
    pub status: Option<u16>,
}

impl UrlCheck {
    pub fn is_fetchable(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Structural check of a direct URL: http(s) or file scheme and an
/// installable archive file name.
pub fn check_artifact_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid URL '{url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https" | "file") {
        anyhow::bail!("Unsupported URL scheme '{}' in {}", parsed.scheme(), url);
    }
    let filename = super::parse::url_filename(url).with_context(|| format!("URL has no file name: {url}"))?;
    let installable = [".whl", ".tar.gz", ".zip", ".tar.bz2"]
        .iter()
        .any(|ext| filename.ends_with(ext));
    if !installable {
        anyhow::bail!("{filename} is not an installable archive");
    }
    Ok(())
}

/// Send a HEAD request to every direct URL in the manifest.
pub async fn verify_direct_urls(
    manifest: &Manifest,
    client: &reqwest::Client,
    concurrency: usize,
) -> Result<Vec<UrlCheck>> {
    let requirements = manifest.direct_urls();
    for requirement in &requirements {
        let url = requirement.direct_url().unwrap_or_default();
        check_artifact_url(url).with_context(|| format!("line {}", requirement.line))?;
    }

    let mut checks: Vec<UrlCheck> = stream::iter(requirements.into_iter().map(|requirement| async move {
        let url = requirement.direct_url().unwrap_or_default().to_string();
        let status = match client.head(&url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                info!(url = url.as_str(), error = %e, "Direct URL check failed");
                None
            }
        };
        UrlCheck {
            name: requirement.name.clone(),
            url,
            line: requirement.line,
            status,
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    checks.sort_by_key(|c| c.line);
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
# Analyzer
textacy==0.13.0
networkx<3.0
langdetect

# Machine learning production
sentence-transformers>=2.2
https://files.example/en_core_web_md-3.7.1-py3-none-any.whl
";

    const INDEX: &str = "\
textacy==0.12.0
textacy==0.13.0
networkx==2.8.8
networkx==3.1
langdetect==1.0.9
sentence-transformers==2.2.2
sentence-transformers==2.3.0rc1
";

    #[test]
    fn test_resolve() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let index = PackageIndex::parse(INDEX).unwrap();
        let resolution = manifest.resolve(&index).unwrap();
        assert_eq!(
            resolution.to_lines(),
            vec![
                "en_core_web_md @ https://files.example/en_core_web_md-3.7.1-py3-none-any.whl",
                "langdetect==1.0.9",
                "networkx==2.8.8",
                "sentence-transformers==2.2.2",
                "textacy==0.13.0",
            ]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let index = PackageIndex::parse(INDEX).unwrap();
        assert_eq!(manifest.resolve(&index).unwrap(), manifest.resolve(&index).unwrap());
    }

    #[test]
    fn test_missing_pin_fails() {
        let manifest = Manifest::parse("textacy==0.14.0\n").unwrap();
        let index = PackageIndex::parse(INDEX).unwrap();
        let err = manifest.resolve(&index).unwrap_err();
        assert!(err.to_string().contains("textacy==0.14.0"));
    }

    #[test]
    fn test_prerelease_only_when_asked() {
        let index = PackageIndex::parse(INDEX).unwrap();
        let manifest = Manifest::parse("sentence-transformers>=2.3.0rc1\n").unwrap();
        let resolution = manifest.resolve(&index).unwrap();
        assert_eq!(resolution.to_lines(), vec!["sentence-transformers==2.3.0rc1"]);
    }

    #[test]
    fn test_duplicate_entries_merge() {
        let index = PackageIndex::parse(INDEX).unwrap();
        let manifest = Manifest::parse("networkx>=2\nNetworkX<3\n").unwrap();
        let resolution = manifest.resolve(&index).unwrap();
        assert_eq!(resolution.to_lines(), vec!["networkx==2.8.8"]);
    }

    #[test]
    fn test_url_version_must_satisfy_constraints() {
        let manifest = Manifest::parse(
            "en-core-web-md<3.7\nhttps://files.example/en_core_web_md-3.7.1-py3-none-any.whl\n",
        )
        .unwrap();
        assert!(manifest.resolve(&PackageIndex::new()).is_err());
    }

    #[test]
    fn test_index_parse_errors() {
        assert!(PackageIndex::parse("textacy>=0.13\n").is_err());
        assert!(PackageIndex::parse("textacy==latest\n").is_err());
        let index = PackageIndex::parse("# freeze\n\nTextacy==0.13.0\n").unwrap();
        assert_eq!(index.versions("textacy").count(), 1);
    }

    #[test]
    fn test_check_artifact_url() {
        assert!(check_artifact_url("https://files.example/pkg-1.0-py3-none-any.whl").is_ok());
        assert!(check_artifact_url("https://files.example/pkg-1.0.tar.gz").is_ok());
        assert!(check_artifact_url("ftp://files.example/pkg-1.0.tar.gz").is_err());
        assert!(check_artifact_url("https://files.example/download").is_err());
    }
}
