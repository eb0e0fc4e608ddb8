//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level hostkit configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote shell settings
    #[serde(default)]
    pub ssh: SshConfig,
    /// Polling policy for state waits
    #[serde(default)]
    pub wait: WaitConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Which remote shell implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// System `ssh` binary
    #[default]
    External,
    /// In-process SSH implementation
    Native,
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::External => write!(f, "external"),
            ClientType::Native => write!(f, "native"),
        }
    }
}

/// Remote shell settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Preferred client implementation
    #[serde(default)]
    pub client: ClientType,
    /// Login user on managed hosts
    #[serde(default = "default_user")]
    pub user: String,
    /// SSH port on managed hosts
    #[serde(default = "default_port")]
    pub port: u16,
    /// Explicit path to the `ssh` binary, otherwise looked up on `PATH`
    pub binary: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            client: ClientType::default(),
            user: default_user(),
            port: default_port(),
            binary: None,
        }
    }
}

fn default_user() -> String {
    "docker".to_string()
}

fn default_port() -> u16 {
    22
}

/// Polling policy used while waiting for a host to reach a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Number of probes before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between probes, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl WaitConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_max_attempts() -> u32 {
    60
}

fn default_interval_ms() -> u64 {
    3000
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full `EnvFilter` spec)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse configuration from a TOML string
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed TOML and `ConfigError::Invalid`
    /// if [`Config::validate`] rejects the result
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `HOSTKIT_CONFIG` or the default paths, or use defaults
    ///
    /// # Errors
    /// Returns error if a config file is found but cannot be loaded
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("HOSTKIT_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let mut paths = vec![
            PathBuf::from("hostkit.toml"),
            PathBuf::from("/etc/hostkit/hostkit.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("hostkit/hostkit.toml"));
        }

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("no config file found, using defaults");
        Ok(Config::default())
    }

    /// Reject values no component can work with
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "wait.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.ssh.port == 0 {
            return Err(ConfigError::Invalid("ssh.port must not be 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ssh.client, ClientType::External);
        assert_eq!(config.ssh.port, 22);
        assert_eq!(config.wait.max_attempts, 60);
        assert_eq!(config.wait.interval(), Duration::from_secs(3));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [ssh]
            client = "native"
            user = "core"

            [wait]
            interval_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.ssh.client, ClientType::Native);
        assert_eq!(config.ssh.user, "core");
        assert_eq!(config.ssh.port, 22);
        assert_eq!(config.wait.max_attempts, 60);
        assert_eq!(config.wait.interval_ms, 10);
        assert!(!config.log.json);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = Config::from_toml("[wait]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_client() {
        let err = Config::from_toml("[ssh]\nclient = \"telnet\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[log]\nlevel = \"debug\"\njson = true").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_default_prefers_env_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ssh]\nuser = \"core\"\n\n[wait]\nmax_attempts = 7").unwrap();

        // the only test touching HOSTKIT_CONFIG
        unsafe { std::env::set_var("HOSTKIT_CONFIG", file.path()) };
        let loaded = Config::load_default();

        let dir = tempfile::tempdir().unwrap();
        unsafe { std::env::set_var("HOSTKIT_CONFIG", dir.path().join("missing.toml")) };
        let missing = Config::load_default();
        unsafe { std::env::remove_var("HOSTKIT_CONFIG") };

        let config = loaded.unwrap();
        assert_eq!(config.ssh.user, "core");
        assert_eq!(config.wait.max_attempts, 7);
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
