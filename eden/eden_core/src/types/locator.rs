//! Hook locators.
//!
//! A locator points at extension code: an absolute path, a `file://` URL or
//! another URL (`https://...`). Locators are compared by normalized form, so
//! `file:///C:/hooks/../a.js` and `c:\a.js` name the same hook.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;
use crate::utils::path::{self, normalize_path};

/// Normalize a locator string.
///
/// Total: relative input stays relative, which [`HookSource::parse`] then
/// rejects.
pub fn normalize_locator(input: &str) -> String {
    let trimmed = input.trim();
    match split_url(trimmed) {
        Some((scheme, rest)) if !scheme.eq_ignore_ascii_case("file") => {
            let (authority, tail) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            let tail = if tail.is_empty() {
                String::new()
            } else {
                normalize_path(tail)
            };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                authority.to_ascii_lowercase(),
                tail
            )
        }
        _ => normalize_path(trimmed),
    }
}

/// Returns `(scheme, rest)` for `scheme://rest`.
///
/// Single-letter schemes are not accepted so that `C://x` stays a drive path.
fn split_url(input: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = scheme.len() > 1
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// A normalized, absolute reference to extension code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HookSource(String);

impl HookSource {
    /// Normalize `locator`, rejecting relative and empty input.
    pub fn parse(locator: &str) -> Result<Self, LifecycleError> {
        let normalized = normalize_locator(locator);
        if normalized.is_empty() {
            return Err(invalid(locator, "empty locator"));
        }
        if split_url(&normalized).is_none() && !path::is_absolute(&normalized) {
            return Err(invalid(locator, "relative locator without a base directory"));
        }
        Ok(Self(normalized))
    }

    /// Normalize `locator`, resolving relative paths against `base`.
    pub fn resolve(base: &str, locator: &str) -> Result<Self, LifecycleError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() || split_url(trimmed).is_some() {
            return Self::parse(trimmed);
        }
        let normalized = normalize_path(trimmed);
        if path::is_absolute(&normalized) {
            return Ok(Self(normalized));
        }
        let base = normalize_path(base);
        if !path::is_absolute(&base) {
            return Err(invalid(locator, "base directory is not absolute"));
        }
        Ok(Self(path::resolve(&base, &normalized)))
    }

    /// The normalized locator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The local path, for locators that refer to the file system.
    pub fn as_path(&self) -> Option<&str> {
        if split_url(&self.0).is_some() {
            None
        } else {
            Some(&self.0)
        }
    }

    /// The last path segment (typically the script file name).
    pub fn file_name(&self) -> Option<&str> {
        path::file_name(&self.0)
    }
}

fn invalid(locator: &str, reason: &str) -> LifecycleError {
    LifecycleError::InvalidLocator {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for HookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HookSource {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HookSource {
    type Error = LifecycleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HookSource> for String {
    fn from(source: HookSource) -> Self {
        source.0
    }
}

impl AsRef<str> for HookSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
