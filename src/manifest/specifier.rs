// Version constraints: `>=2.6,<3`, `==3.7.1`, `~=1.4`, `!=1.5.*`.
//
// A VersionSpec is a comma-separated conjunction of constraints. An empty
// spec accepts every version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;

use super::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
    Compatible,
    Arbitrary,
}

impl Operator {
    /// Longest operators first so `>=` isn't read as `>`.
    const ALL: [(&'static str, Operator); 8] = [
        ("===", Operator::Arbitrary),
        ("==", Operator::Equal),
        ("!=", Operator::NotEqual),
        (">=", Operator::GreaterEqual),
        ("<=", Operator::LessEqual),
        ("~=", Operator::Compatible),
        (">", Operator::Greater),
        ("<", Operator::Less),
    ];

    pub fn as_str(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, op)| op == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }
}

/// One operator applied to one version.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub op: Operator,
    /// The version text as written (what `===` compares against)
    pub raw: String,
    /// Parsed version; `None` only for `===` on a non-standard string
    pub version: Option<Version>,
    /// `==1.4.*` / `!=1.4.*`
    pub wildcard: bool,
}

impl Constraint {
    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(version) = &self.version else {
            return self.op == Operator::Arbitrary && self.raw.eq_ignore_ascii_case(&candidate.to_string());
        };

        match self.op {
            Operator::Equal if self.wildcard => candidate.release_starts_with(&version.release),
            Operator::Equal => candidate == version,
            Operator::NotEqual if self.wildcard => !candidate.release_starts_with(&version.release),
            Operator::NotEqual => candidate != version,
            Operator::GreaterEqual => candidate >= version,
            Operator::LessEqual => candidate <= version,
            Operator::Greater => {
                // >1.0 doesn't admit 1.0.post1 unless the bound is itself a post release
                candidate > version
                    && !(candidate.is_postrelease()
                        && !version.is_postrelease()
                        && candidate.cmp_release(&version.release) == Ordering::Equal)
            }
            Operator::Less => {
                // <3.0 doesn't admit 3.0rc1 unless the bound is itself a pre-release
                candidate < version
                    && !(candidate.is_prerelease()
                        && !version.is_prerelease()
                        && candidate.cmp_release(&version.release) == Ordering::Equal)
            }
            Operator::Compatible => {
                let prefix = &version.release[..version.release.len() - 1];
                candidate >= version && candidate.release_starts_with(prefix)
            }
            Operator::Arbitrary => self.raw.eq_ignore_ascii_case(&candidate.to_string()),
        }
    }

    /// Whether this constraint alone rejects every version from `major.dev0` up.
    fn excludes_major_and_above(&self, major: u64) -> bool {
        let floor = Version::major_floor(major);
        let Some(version) = &self.version else {
            return false;
        };
        match self.op {
            // <3.0 also drops 3.0rc1 and 3.0.dev0, but <3.0.post1 admits 3.0
            Operator::Less if !version.is_prerelease() && !version.is_postrelease() => {
                version.cmp_release(&[major]) != Ordering::Greater
            }
            Operator::Less => *version <= floor,
            Operator::LessEqual => *version < floor,
            Operator::Equal if self.wildcard => version.major() < major,
            Operator::Equal | Operator::Arbitrary => *version < floor,
            Operator::Compatible => {
                // ~=2.6 means >=2.6,==2.*, whose ceiling is 3
                let mut ceiling = version.release[..version.release.len() - 1].to_vec();
                if let Some(last) = ceiling.last_mut() {
                    *last += 1;
                }
                Version::from_release(&ceiling).cmp_release(&[major]) != Ordering::Greater
            }
            Operator::NotEqual | Operator::GreaterEqual | Operator::Greater => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.raw)?;
        if self.wildcard {
            write!(f, ".*")?;
        }
        Ok(())
    }
}

impl FromStr for Constraint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let (op_text, op) = Operator::ALL
            .iter()
            .find(|(op_text, _)| text.starts_with(op_text))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Constraint '{}' has no comparison operator", text))?;

        let rest = text[op_text.len()..].trim();
        if rest.is_empty() {
            anyhow::bail!("Constraint '{}' has no version", text);
        }

        if op == Operator::Arbitrary {
            return Ok(Self {
                op,
                raw: rest.to_string(),
                version: rest.parse().ok(),
                wildcard: false,
            });
        }

        let (raw, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => {
                if !matches!(op, Operator::Equal | Operator::NotEqual) {
                    anyhow::bail!("Wildcard versions only work with == and !=: '{}'", text);
                }
                (prefix, true)
            }
            None => (rest, false),
        };

        let version: Version = raw.parse()?;
        if wildcard && (version.is_prerelease() || version.is_postrelease()) {
            anyhow::bail!("Wildcard prefix must be a plain release: '{}'", text);
        }
        if op == Operator::Compatible && version.release.len() < 2 {
            anyhow::bail!("~= needs at least two release numbers: '{}'", text);
        }

        Ok(Self {
            op,
            raw: raw.to_string(),
            version: Some(version),
            wildcard,
        })
    }
}

/// A conjunction of constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionSpec {
    pub constraints: Vec<Constraint>,
}

impl VersionSpec {
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn contains(&self, candidate: &Version) -> bool {
        self.constraints.iter().all(|c| c.contains(candidate))
    }

    /// Whether the spec rejects every version of `major` and every later one.
    ///
    /// One constraint has to carry the upper bound on its own; `!=` never does.
    pub fn excludes_major_and_above(&self, major: u64) -> bool {
        self.constraints
            .iter()
            .any(|c| c.excludes_major_and_above(major))
    }

    /// The exact version this spec pins, if it is a single non-wildcard `==`.
    pub fn pinned(&self) -> Option<&Version> {
        match self.constraints.as_slice() {
            [Constraint {
                op: Operator::Equal,
                version: Some(version),
                wildcard: false,
                ..
            }] => Some(version),
            _ => None,
        }
    }

    /// Whether any constraint names a pre-release, which opts the spec into them.
    pub fn mentions_prerelease(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| c.version.as_ref().is_some_and(Version::is_prerelease))
    }

    /// Combine two specs into one that requires both.
    pub fn and(&self, other: &VersionSpec) -> VersionSpec {
        let mut constraints = self.constraints.clone();
        constraints.extend(other.constraints.iter().cloned());
        VersionSpec { constraints }
    }
}

impl FromStr for VersionSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let constraints = text
            .split(',')
            .map(|part| part.parse::<Constraint>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { constraints })
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> VersionSpec {
        s.parse().unwrap()
    }

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(spec(">=2.6, <3").to_string(), ">=2.6,<3");
        assert_eq!(spec("==1.4.*").to_string(), "==1.4.*");
        assert!(spec("").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!("2.0".parse::<VersionSpec>().is_err());
        assert!(">=".parse::<VersionSpec>().is_err());
        assert!(">=1.*".parse::<VersionSpec>().is_err());
        assert!("~=1".parse::<VersionSpec>().is_err());
        assert!(">=1.0,".parse::<VersionSpec>().is_err());
    }

    #[test]
    fn test_contains_basic_ops() {
        assert!(spec("==3.7.1").contains(&v("3.7.1")));
        assert!(spec("==3.7").contains(&v("3.7.0")));
        assert!(!spec("==3.7.1").contains(&v("3.7.2")));
        assert!(spec("!=1.5").contains(&v("1.6")));
        assert!(spec(">=2.6,<3").contains(&v("2.8.8")));
        assert!(!spec(">=2.6,<3").contains(&v("3.0")));
        assert!(!spec(">=2.6,<3").contains(&v("2.5")));
        assert!(spec("<=2.0").contains(&v("2.0")));
    }

    #[test]
    fn test_wildcards() {
        assert!(spec("==1.4.*").contains(&v("1.4.9")));
        assert!(!spec("==1.4.*").contains(&v("1.5")));
        assert!(!spec("!=1.4.*").contains(&v("1.4.2")));
    }

    #[test]
    fn test_compatible_release() {
        let s = spec("~=2.2");
        assert!(s.contains(&v("2.2")));
        assert!(s.contains(&v("2.9")));
        assert!(!s.contains(&v("3.0")));
        assert!(!s.contains(&v("2.1")));
        let s = spec("~=1.4.5");
        assert!(s.contains(&v("1.4.9")));
        assert!(!s.contains(&v("1.5.0")));
    }

    #[test]
    fn test_exclusive_bounds_and_prereleases() {
        assert!(!spec("<3.0").contains(&v("3.0rc1")));
        assert!(!spec("<3.0").contains(&v("3.0.dev0")));
        assert!(spec("<3.0rc2").contains(&v("3.0rc1")));
        assert!(!spec(">1.0").contains(&v("1.0.post1")));
        assert!(spec(">1.0").contains(&v("1.0.1")));
    }

    #[test]
    fn test_arbitrary_equality() {
        assert!(spec("===1.0").contains(&v("1.0")));
        assert!(!spec("===1.0").contains(&v("1.0.0")));
    }

    #[test]
    fn test_excludes_major_and_above() {
        assert!(spec("<3.0").excludes_major_and_above(3));
        assert!(spec(">=2.6,<3").excludes_major_and_above(3));
        assert!(spec("~=2.6").excludes_major_and_above(3));
        assert!(spec("==2.8.8").excludes_major_and_above(3));
        assert!(spec("==2.*").excludes_major_and_above(3));
        assert!(spec("<=2.99").excludes_major_and_above(3));

        assert!(!spec("<3.1").excludes_major_and_above(3));
        assert!(!spec(">=2").excludes_major_and_above(3));
        assert!(!spec("~=3.0.1").excludes_major_and_above(3));
        assert!(!spec("!=3.*").excludes_major_and_above(3));
        assert!(!spec("").excludes_major_and_above(3));
    }

    #[test]
    fn test_excludes_agrees_with_contains() {
        let probes = ["3.0.dev0", "3.0a1", "3.0rc1", "3.0", "3.0.post1", "3.4", "4.0"];
        for text in ["<3.0", ">=2.6,<3", "~=2.6", "==2.*", "<2.9.post1"] {
            let s = spec(text);
            assert!(s.excludes_major_and_above(3), "{} should exclude 3", text);
            for probe in probes {
                assert!(!s.contains(&v(probe)), "{} should reject {}", text, probe);
            }
        }

        // Whenever a bound admits some 3.x version it must not claim to exclude 3
        for text in ["<3.0.post1", "<=3.0", "<3.0.1", "==3.0", "~=2.9.post1"] {
            let s = spec(text);
            if probes.iter().any(|probe| s.contains(&v(probe))) {
                assert!(!s.excludes_major_and_above(3), "{} admits a 3.x version", text);
            }
        }
    }

    #[test]
    fn test_post_release_bound_admits_its_final_release() {
        let s = spec("<3.0.post1");
        assert!(s.contains(&v("3.0")));
        assert!(!s.excludes_major_and_above(3));
        assert!(s.excludes_major_and_above(4));
    }

    #[test]
    fn test_pinned_and_and() {
        assert_eq!(spec("==1.0.9").pinned(), Some(&v("1.0.9")));
        assert!(spec(">=1.0").pinned().is_none());
        let both = spec(">=2.6").and(&spec("<3"));
        assert_eq!(both.to_string(), ">=2.6,<3");
        assert!(spec(">=1.0rc1").mentions_prerelease());
    }
}
