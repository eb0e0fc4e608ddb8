//! Package and service action vocabularies
//!
//! The canonical strings are used in logs and in the commands sent to hosts,
//! they must not change.

use serde::{Deserialize, Serialize};

/// Operation to perform on a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum PackageAction {
    Install = 0,
    Remove,
    Upgrade,
}

impl PackageAction {
    /// Every declared action, in declaration order
    pub const ALL: [PackageAction; 3] = [
        PackageAction::Install,
        PackageAction::Remove,
        PackageAction::Upgrade,
    ];

    /// Canonical string for this action
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PackageAction::Install => "install",
            PackageAction::Remove => "remove",
            PackageAction::Upgrade => "upgrade",
        }
    }

    /// Look up an action by its raw discriminant
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Render a raw discriminant, out-of-range values render as ""
    #[must_use]
    pub fn describe(raw: u32) -> &'static str {
        Self::from_raw(raw).map_or("", Self::as_str)
    }
}

impl std::fmt::Display for PackageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation to perform on a system service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum ServiceAction {
    Restart = 0,
    Start,
    Stop,
    Enable,
    Disable,
    DaemonReload,
}

impl ServiceAction {
    /// Every declared action, in declaration order
    pub const ALL: [ServiceAction; 6] = [
        ServiceAction::Restart,
        ServiceAction::Start,
        ServiceAction::Stop,
        ServiceAction::Enable,
        ServiceAction::Disable,
        ServiceAction::DaemonReload,
    ];

    /// Canonical string for this action
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Restart => "restart",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
            ServiceAction::DaemonReload => "daemon-reload",
        }
    }

    /// Look up an action by its raw discriminant
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Render a raw discriminant, out-of-range values render as ""
    #[must_use]
    pub fn describe(raw: u32) -> &'static str {
        Self::from_raw(raw).map_or("", Self::as_str)
    }
}

impl std::fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
