//! Version numbers and package compatibility ranges.
//!
//! Packages declare the host versions they are compatible with (`compat`)
//! and the ones they were tested against (`tested`). Entries are either a
//! component prefix with optional wildcards (`4`, `4.1`, `4.x`, `4.1.*`),
//! an exact version, or a lower bound (`>=4.0.0`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Error parsing a version or compatibility range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid version '{input}': {reason}")]
pub struct VersionParseError {
    /// The rejected text.
    pub input: String,

    /// Why it was rejected.
    pub reason: String,
}

impl VersionParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A `major.minor.patch` version with optional prerelease tag.
///
/// Missing components parse as zero, and a leading `v` is accepted, so
/// `v4.1` equals `4.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major version number.
    pub major: u32,

    /// Minor version number.
    pub minor: u32,

    /// Patch version number.
    pub patch: u32,

    /// Prerelease identifiers (`4.0.0-beta.1` has `beta.1`).
    pub prerelease: Option<String>,
}

impl Version {
    /// Create a release version.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Whether this is a prerelease.
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                // A prerelease sorts before its release
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let text = text.strip_prefix('v').unwrap_or(text);
        if text.is_empty() {
            return Err(VersionParseError::new(s, "empty version"));
        }

        let (core, prerelease) = match text.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(VersionParseError::new(s, "empty prerelease")),
            None => (text, None),
        };

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in core.split('.') {
            if count == 3 {
                return Err(VersionParseError::new(s, "too many components"));
            }
            parts[count] = component
                .parse()
                .map_err(|_| VersionParseError::new(s, format!("bad component '{}'", component)))?;
            count += 1;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            prerelease,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// One entry of a package's `compat` or `tested` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// Leading components that must match; `None` is a wildcard.
    Prefix(Vec<Option<u32>>),

    /// Inclusive lower bound.
    AtLeast(Version),
}

impl VersionRange {
    /// Check whether `version` falls inside this range.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::AtLeast(min) => version >= min,
            Self::Prefix(components) => {
                let actual = [version.major, version.minor, version.patch];
                components
                    .iter()
                    .zip(actual.iter())
                    .all(|(expected, actual)| expected.map_or(true, |e| e == *actual))
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some(bound) = text.strip_prefix(">=") {
            return Ok(Self::AtLeast(bound.parse()?));
        }

        let text = text.strip_prefix('v').unwrap_or(text);
        let mut components = Vec::new();
        for component in text.split('.') {
            match component {
                "x" | "X" | "*" => components.push(None),
                number => components.push(Some(number.parse().map_err(|_| {
                    VersionParseError::new(s, format!("bad range component '{}'", number))
                })?)),
            }
        }
        if components.len() > 3 {
            return Err(VersionParseError::new(s, "too many components"));
        }
        Ok(Self::Prefix(components))
    }
}

/// Check `host` against a list of range strings.
///
/// An empty list means "unrestricted". Entries that fail to parse are
/// ignored.
pub fn satisfies_any<S: AsRef<str>>(host: &Version, ranges: &[S]) -> bool {
    ranges.is_empty()
        || ranges
            .iter()
            .filter_map(|r| r.as_ref().parse::<VersionRange>().ok())
            .any(|range| range.matches(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!("4.1.2".parse::<Version>().unwrap(), Version::new(4, 1, 2));
        assert_eq!("v4.1".parse::<Version>().unwrap(), Version::new(4, 1, 0));
        let beta: Version = "4.0.0-beta.1".parse().unwrap();
        assert_eq!(beta.prerelease.as_deref(), Some("beta.1"));
        assert!("4.a".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        let release = Version::new(4, 0, 0);
        let beta: Version = "4.0.0-beta".parse().unwrap();
        assert!(beta < release);
        assert!(Version::new(3, 9, 9) < beta);
        assert_eq!(release.to_string(), "4.0.0");
        assert_eq!(beta.to_string(), "4.0.0-beta");
    }

    #[test]
    fn test_ranges() {
        let host = Version::new(4, 1, 2);
        assert!("4".parse::<VersionRange>().unwrap().matches(&host));
        assert!("4.x".parse::<VersionRange>().unwrap().matches(&host));
        assert!("4.1.*".parse::<VersionRange>().unwrap().matches(&host));
        assert!(!"4.2".parse::<VersionRange>().unwrap().matches(&host));
        assert!(">=4.0.0".parse::<VersionRange>().unwrap().matches(&host));
        assert!(!">=5".parse::<VersionRange>().unwrap().matches(&host));
    }

    #[test]
    fn test_satisfies_any() {
        let host = Version::new(4, 1, 0);
        assert!(satisfies_any::<&str>(&host, &[]));
        assert!(satisfies_any(&host, &["3.x", "4.1"]));
        assert!(!satisfies_any(&host, &["3.x", "garbage"]));
    }
}
