//! API and persisted-config version numbers

/// Version of the library API exposed to drivers
pub const API_VERSION: u32 = 1;

/// Schema version of the persisted host representation
///
/// Bumped on every breaking change to [`crate::host::Host`].
pub const CONFIG_VERSION: u32 = 3;
