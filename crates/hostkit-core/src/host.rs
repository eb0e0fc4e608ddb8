//! Host record and hostname validation

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::version::CONFIG_VERSION;

/// A managed machine as persisted in a [`crate::store::HostStore`]
///
/// The driver configuration is carried as opaque JSON and never
/// inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Schema version this record was written with
    pub config_version: u32,
    /// Unique name within a store
    pub name: String,
    /// Name of the driver that manages this host
    pub driver_name: String,
    /// Driver-owned configuration
    #[serde(default)]
    pub driver: serde_json::Value,
}

impl Host {
    /// Create a host record stamped with the current config version
    ///
    /// # Errors
    /// Returns `HostError::InvalidHostname` if `name` fails [`validate_host_name`]
    pub fn new(name: impl Into<String>, driver_name: impl Into<String>) -> Result<Self, HostError> {
        let name = name.into();
        if !validate_host_name(&name) {
            return Err(HostError::InvalidHostname);
        }

        Ok(Self {
            config_version: CONFIG_VERSION,
            name,
            driver_name: driver_name.into(),
            driver: serde_json::Value::Null,
        })
    }

    /// Attach driver configuration
    #[must_use]
    pub fn with_driver_config(mut self, driver: serde_json::Value) -> Self {
        self.driver = driver;
        self
    }

    /// Whether this record predates the current schema
    #[must_use]
    pub fn needs_migration(&self) -> bool {
        self.config_version < CONFIG_VERSION
    }
}

/// Check a hostname against `^[a-zA-Z0-9][a-zA-Z0-9.-]*$`
#[must_use]
pub fn validate_host_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        }
        _ => false,
    }
}
