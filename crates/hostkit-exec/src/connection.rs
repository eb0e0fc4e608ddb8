//! Connection details for a host

use std::path::{Path, PathBuf};

use hostkit_core::SshConfig;
use serde::{Deserialize, Serialize};

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host address
    pub host: String,
    /// Port (default 22)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username
    pub user: String,
    /// Private keys to offer, in order
    #[serde(default)]
    pub keys: Vec<PathBuf>,
}

fn default_port() -> u16 {
    22
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: user.into(),
            keys: Vec::new(),
        }
    }

    /// Connection info for `host` using the configured user and port
    pub fn from_config(host: impl Into<String>, config: &SshConfig) -> Self {
        Self::new(host, config.user.clone()).with_port(config.port)
    }

    /// Add a private key
    #[must_use]
    pub fn with_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.keys.push(path.into());
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Configured keys, skipping empty paths
    pub fn key_paths(&self) -> impl Iterator<Item = &Path> {
        self.keys
            .iter()
            .map(PathBuf::as_path)
            .filter(|key| !key.as_os_str().is_empty())
    }

    /// `user@host` as passed to ssh
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}
