//! Host lifecycle state vocabulary

use serde::{Deserialize, Serialize};

/// Observed lifecycle condition of a host
///
/// Declaration order is part of the contract: the raw discriminants are
/// stable and `State::from_raw` / `State::describe` rely on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum State {
    /// No state observed yet
    #[default]
    #[serde(rename = "")]
    None = 0,
    Running,
    Paused,
    Saved,
    Stopped,
    Stopping,
    Starting,
    Error,
    Timeout,
}

impl State {
    /// Every declared state, in declaration order
    pub const ALL: [State; 9] = [
        State::None,
        State::Running,
        State::Paused,
        State::Saved,
        State::Stopped,
        State::Stopping,
        State::Starting,
        State::Error,
        State::Timeout,
    ];

    /// Canonical string for this state
    ///
    /// `None` renders as the empty string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            State::None => "",
            State::Running => "Running",
            State::Paused => "Paused",
            State::Saved => "Saved",
            State::Stopped => "Stopped",
            State::Stopping => "Stopping",
            State::Starting => "Starting",
            State::Error => "Error",
            State::Timeout => "Timeout",
        }
    }

    /// Look up a state by its raw discriminant
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Render a raw discriminant, out-of-range values render as ""
    #[must_use]
    pub fn describe(raw: i32) -> &'static str {
        Self::from_raw(raw).map_or("", Self::as_str)
    }

    /// Whether the host is between two stable states
    #[must_use]
    pub fn is_transitional(self) -> bool {
        matches!(self, State::Starting | State::Stopping)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Returned when parsing a string that is not a canonical state name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown host state: {0:?}")]
pub struct UnknownState(pub String);
