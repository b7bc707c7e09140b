// Package versions: release numbers plus pre, post and dev parts.
//
// Ordering follows the packaging rules the manifest is written for:
//   1.0.dev1 < 1.0a1.dev1 < 1.0a1 < 1.0b2 < 1.0rc1 < 1.0 < 1.0.post1
// Missing release components compare as zero, so 1.0 == 1.0.0.
// A local label (`+abc`) is kept for display but ignored when comparing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::Result;
use regex_lite::Regex;

/// Pre-release phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    fn as_str(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::ReleaseCandidate => "rc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    pub release: Vec<u64>,
    pub pre: Option<(PreRelease, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^v?(?P<release>[0-9]+(?:\.[0-9]+)*)",
            r"(?:[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>[0-9]+)?)?",
            r"(?:-(?P<post_implicit>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n>[0-9]+)?)?",
            r"(?:[-_.]?(?P<dev>dev)[-_.]?(?P<dev_n>[0-9]+)?)?",
            r"(?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
        ))
        .expect("version regex is valid")
    })
}

impl Version {
    /// A final release with the given components.
    pub fn from_release(release: &[u64]) -> Self {
        Self {
            release: release.to_vec(),
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    /// The earliest version of a major line: `{major}.dev0`.
    pub fn major_floor(major: u64) -> Self {
        Self {
            dev: Some(0),
            ..Self::from_release(&[major])
        }
    }

    pub fn major(&self) -> u64 {
        self.release.first().copied().unwrap_or(0)
    }

    /// Alpha, beta, release candidate or dev release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Compare release numbers only, padding the shorter with zeros.
    pub fn cmp_release(&self, other: &[u64]) -> Ordering {
        let len = self.release.len().max(other.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    /// Whether the release starts with `prefix` (zero padded).
    pub fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, &p)| self.release.get(i).copied().unwrap_or(0) == p)
    }

    /// Where the version sits relative to its release's final version.
    ///
    /// A bare dev release sorts before every pre-release of the same release.
    fn phase_key(&self) -> (u8, u8, u64) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, 0, 0),
            (Some((kind, n)), _, _) => (1, kind as u8, n),
            _ => (2, 0, 0),
        }
    }

    fn dev_key(&self) -> (bool, u64) {
        match self.dev {
            Some(n) => (false, n),
            None => (true, 0),
        }
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let caps = version_regex()
            .captures(text)
            .ok_or_else(|| anyhow::anyhow!("Invalid version '{}'", text))?;

        let release = caps["release"]
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid release number in '{}': {}", text, e))?;

        let number = |name: &str| -> Result<Option<u64>> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("Invalid number in '{}': {}", text, e))
        };

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let kind = match label.as_str().to_lowercase().as_str() {
                    "a" | "alpha" => PreRelease::Alpha,
                    "b" | "beta" => PreRelease::Beta,
                    _ => PreRelease::ReleaseCandidate,
                };
                Some((kind, number("pre_n")?.unwrap_or(0)))
            }
            None => None,
        };

        let post = match number("post_implicit")? {
            Some(n) => Some(n),
            None if caps.name("post_l").is_some() => Some(number("post_n")?.unwrap_or(0)),
            None => None,
        };

        let dev = if caps.name("dev").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        Ok(Self {
            release,
            pre,
            post,
            dev,
            local: caps.name("local").map(|m| m.as_str().to_lowercase()),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_release(&other.release)
            .then_with(|| self.phase_key().cmp(&other.phase_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(v("3.7.1").release, vec![3, 7, 1]);
        assert_eq!(v("1.0rc2").pre, Some((PreRelease::ReleaseCandidate, 2)));
        assert_eq!(v("1.0-beta.3").pre, Some((PreRelease::Beta, 3)));
        assert_eq!(v("2.0.post1").post, Some(1));
        assert_eq!(v("2.0-1").post, Some(1));
        assert_eq!(v("2.0.dev4").dev, Some(4));
        assert_eq!(v("v1.2").release, vec![1, 2]);
        assert_eq!(v("1.0+cpu").local.as_deref(), Some("cpu"));
    }

    #[test]
    fn test_rc_is_not_post() {
        let version = v("3.0rc1");
        assert!(version.post.is_none());
        assert!(version.is_prerelease());
    }

    #[test]
    fn test_invalid_versions() {
        assert!("".parse::<Version>().is_err());
        assert!("latest".parse::<Version>().is_err());
        assert!("1..2".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        let ordered = [
            "1.0.dev1", "1.0a1.dev1", "1.0a1", "1.0a2", "1.0b1", "1.0rc1", "1.0", "1.0.post1", "1.0.1",
            "1.1", "2.0",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_zero_padding_and_local() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0+cpu"), v("1.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(v("1.0RC1").to_string(), "1.0rc1");
        assert_eq!(v("2.0.0-post2").to_string(), "2.0.0.post2");
        assert_eq!(Version::major_floor(3).to_string(), "3.dev0");
    }
}
