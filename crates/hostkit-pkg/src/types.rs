//! Distribution detection types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Package manager type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManagerType {
    /// APT (Debian/Ubuntu)
    Apt,
    /// DNF (Fedora/RHEL 8+)
    Dnf,
    /// YUM (older RHEL/CentOS)
    Yum,
    /// Zypper (openSUSE/SLES)
    Zypper,
}

impl std::fmt::Display for PackageManagerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageManagerType::Apt => write!(f, "apt"),
            PackageManagerType::Dnf => write!(f, "dnf"),
            PackageManagerType::Yum => write!(f, "yum"),
            PackageManagerType::Zypper => write!(f, "zypper"),
        }
    }
}

/// Distribution family, which decides the package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistroFamily {
    Debian,
    RedHat,
    Suse,
}

/// Parsed `/etc/os-release`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRelease {
    /// Distribution ID (debian, ubuntu, fedora, etc.)
    pub id: String,
    /// Space-separated `ID_LIKE`, split
    pub id_like: Vec<String>,
    pub name: String,
    pub version_id: String,
    /// Every key, including the ones above
    pub fields: BTreeMap<String, String>,
}

impl OsRelease {
    /// Parse os-release `KEY=value` lines
    ///
    /// Comments, blank lines and lines without `=` are skipped. Values may
    /// be wrapped in single or double quotes.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let fields: BTreeMap<String, String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();

        let get = |key: &str| fields.get(key).cloned().unwrap_or_default();

        Self {
            id: get("ID"),
            id_like: get("ID_LIKE")
                .split_whitespace()
                .map(ToString::to_string)
                .collect(),
            name: get("NAME"),
            version_id: get("VERSION_ID"),
            fields,
        }
    }

    /// Family from `ID`, falling back to each `ID_LIKE` entry
    #[must_use]
    pub fn family(&self) -> Option<DistroFamily> {
        std::iter::once(&self.id)
            .chain(&self.id_like)
            .find_map(|id| family_of(id))
    }
}

fn family_of(id: &str) -> Option<DistroFamily> {
    match id {
        "debian" | "ubuntu" => Some(DistroFamily::Debian),
        "fedora" | "rhel" | "centos" | "rocky" | "almalinux" => Some(DistroFamily::RedHat),
        "suse" | "sles" => Some(DistroFamily::Suse),
        id if id.starts_with("opensuse") => Some(DistroFamily::Suse),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 24.04.1 LTS"
NAME="Ubuntu"
VERSION_ID="24.04"
ID=ubuntu
ID_LIKE=debian
"#;

    #[test]
    fn test_parse_ubuntu() {
        let release = OsRelease::parse(UBUNTU);
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.id_like, vec!["debian"]);
        assert_eq!(release.name, "Ubuntu");
        assert_eq!(release.version_id, "24.04");
        assert_eq!(release.fields["PRETTY_NAME"], "Ubuntu 24.04.1 LTS");
        assert_eq!(release.family(), Some(DistroFamily::Debian));
    }

    #[test]
    fn test_family_from_id_like() {
        let release = OsRelease::parse("ID=\"ol\"\nID_LIKE=\"fedora rhel\"\n# comment\n");
        assert_eq!(release.id, "ol");
        assert_eq!(release.family(), Some(DistroFamily::RedHat));
    }

    #[test]
    fn test_opensuse_variants() {
        let release = OsRelease::parse("ID='opensuse-tumbleweed'\nID_LIKE='opensuse suse'");
        assert_eq!(release.family(), Some(DistroFamily::Suse));
    }

    #[test]
    fn test_unknown_distro() {
        let release = OsRelease::parse("ID=arch\n");
        assert_eq!(release.family(), None);
        assert_eq!(OsRelease::parse("").family(), None);
    }

    #[test]
    fn test_manager_display() {
        assert_eq!(PackageManagerType::Zypper.to_string(), "zypper");
    }
}
