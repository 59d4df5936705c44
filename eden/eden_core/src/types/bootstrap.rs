//! Data the host collected while booting, handed to every hook.

use serde::{Deserialize, Serialize};

/// Firmware boot mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BootPolicy {
    #[default]
    Legacy,
    #[serde(rename = "UEFI")]
    Uefi,
}

/// Boot environment facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapData {
    /// Drive the host booted from, once found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<String>,

    /// Candidate drives, sorted
    #[serde(default)]
    pub drives: Vec<String>,

    /// Installation directory of the host
    pub location: String,

    /// Desktop directory of the session user
    #[serde(default)]
    pub desktop: String,

    /// Host version
    pub version: String,

    /// Firmware boot mode
    #[serde(default)]
    pub boot_policy: BootPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_json() {
        let data: BootstrapData = serde_json::from_str(
            r#"{"drives":["D:","E:"],"location":"X:/Edgeless","version":"4.1.0","bootPolicy":"UEFI"}"#,
        )
        .unwrap();
        assert_eq!(data.boot_policy, BootPolicy::Uefi);
        assert_eq!(data.drive, None);
        assert_eq!(data.drives.len(), 2);

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["bootPolicy"], "UEFI");
        assert!(value.get("drive").is_none());
    }
}
