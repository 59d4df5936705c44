//! Package metadata declared by extensions and supplied by the host.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::version::{satisfies_any, Version};

/// What kind of package an extension ships as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    #[default]
    Software,
    Driver,
    Manifest,
    Dependency,
    Theme,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Software => "Software",
            Self::Driver => "Driver",
            Self::Manifest => "Manifest",
            Self::Dependency => "Dependency",
            Self::Theme => "Theme",
        };
        f.write_str(name)
    }
}

/// Metadata an extension declares about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOptions {
    /// Package name, also its identity in the audit log
    pub name: String,

    /// Package kind
    #[serde(rename = "type", default)]
    pub package_type: PackageType,

    /// Package version
    pub version: String,

    /// Package authors
    #[serde(default)]
    pub authors: Vec<String>,

    /// Host versions the package claims to work with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compat: Option<Vec<String>>,

    /// Host versions the package was tested on
    #[serde(default)]
    pub tested: Vec<String>,

    /// License identifier
    #[serde(default)]
    pub license: String,
}

impl PackageOptions {
    /// Minimal metadata for a package called `name`.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_type: PackageType::Software,
            version: version.into(),
            authors: Vec::new(),
            compat: None,
            tested: Vec::new(),
            license: String::new(),
        }
    }

    /// Whether `host` is inside the declared `compat` ranges.
    ///
    /// Packages that declare no `compat` list are compatible with anything.
    pub fn is_compatible_with(&self, host: &Version) -> bool {
        self.compat
            .as_deref()
            .map_or(true, |ranges| satisfies_any(host, ranges))
    }

    /// Whether `host` is inside the declared `tested` ranges.
    pub fn is_tested_on(&self, host: &Version) -> bool {
        satisfies_any(host, &self.tested)
    }
}

/// How the host loads a particular package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLoadOptions {
    /// User policy applied to the package, if any
    #[serde(default, alias = "userPolt", skip_serializing_if = "Option::is_none")]
    pub user_policy: Option<String>,

    /// Directory the package is installed into
    pub dest: String,

    /// Whether the package was loaded by the local boost step
    #[serde(default)]
    pub localboost: bool,

    /// Package kind as seen by the loader
    #[serde(rename = "type", default)]
    pub package_type: PackageType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_options_json() {
        let json = r#"{
            "name": "wallpaper",
            "type": "Theme",
            "version": "1.2.0",
            "authors": ["Edgeless Team"],
            "compat": ["4.x"],
            "tested": ["4.1.0"],
            "license": "MIT"
        }"#;
        let options: PackageOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.package_type, PackageType::Theme);
        assert_eq!(options.compat, Some(vec!["4.x".to_string()]));

        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["type"], "Theme");
    }

    #[test]
    fn test_compatibility() {
        let mut options = PackageOptions::new("tool", "0.1.0");
        let host = Version::new(4, 1, 0);
        assert!(options.is_compatible_with(&host));
        // an empty `tested` list does not restrict anything either
        assert!(options.is_tested_on(&host));

        options.compat = Some(vec!["3.x".to_string()]);
        options.tested = vec!["3.9".to_string()];
        assert!(!options.is_compatible_with(&host));
        assert!(!options.is_tested_on(&host));
    }

    #[test]
    fn test_load_options_accept_legacy_field_name() {
        let opts: PackageLoadOptions =
            serde_json::from_str(r#"{"userPolt":"strict","dest":"X:/pkg","localboost":true,"type":"Driver"}"#)
                .unwrap();
        assert_eq!(opts.user_policy.as_deref(), Some("strict"));
        assert_eq!(opts.package_type, PackageType::Driver);
        assert!(opts.localboost);

        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["userPolicy"], "strict");
    }
}
