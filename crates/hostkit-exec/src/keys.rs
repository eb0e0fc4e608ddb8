//! SSH private key handling

use std::env;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

/// Where a private key comes from
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Key file on disk
    Path(PathBuf),
    /// Base64-encoded key held in an environment variable
    Env(String),
}

impl KeySource {
    /// Resolve to a key file on disk
    ///
    /// `Env` keys are written to a freshly created 0600 temp file with a
    /// unique name, removed when the returned [`ResolvedKey`] is dropped.
    ///
    /// # Errors
    /// Returns `KeyError` if the variable is unset, not base64, or the key
    /// file fails [`check_private_key`]
    pub fn resolve(&self) -> Result<ResolvedKey, KeyError> {
        match self {
            KeySource::Path(path) => {
                check_private_key(path)?;
                Ok(ResolvedKey::Path(path.clone()))
            }
            KeySource::Env(var_name) => {
                let encoded =
                    env::var(var_name).map_err(|_| KeyError::EnvNotSet(var_name.clone()))?;
                let key_data = base64_decode(&encoded).map_err(|_| KeyError::InvalidBase64)?;
                Ok(ResolvedKey::Temp(write_temp_key(&key_data)?))
            }
        }
    }
}

/// Key file ready to hand to an SSH client
#[derive(Debug)]
pub enum ResolvedKey {
    /// Caller-owned key file
    Path(PathBuf),
    /// Temporary file, deleted on drop
    Temp(NamedTempFile),
}

impl ResolvedKey {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ResolvedKey::Path(p) => p,
            ResolvedKey::Temp(file) => file.path(),
        }
    }
}

/// Key resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("'{0}' is not readable")]
    NotReadable(String),

    #[error("permissions {mode:#o} for '{path}' are too open")]
    TooOpen { path: String, mode: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input.trim())
}

/// Check that a key file exists, is owner-readable and private
///
/// # Errors
/// Returns `KeyError::Io` if the file cannot be inspected, `NotReadable` or
/// `TooOpen` on bad permissions
#[cfg(unix)]
pub fn check_private_key(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    debug!(path = %path.display(), mode = format!("{mode:#o}"), "checking SSH private key");

    if mode & 0o400 == 0 {
        return Err(KeyError::NotReadable(path.display().to_string()));
    }
    if mode & 0o077 != 0 {
        return Err(KeyError::TooOpen {
            path: path.display().to_string(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_private_key(path: &Path) -> Result<(), KeyError> {
    std::fs::metadata(path)?;
    Ok(())
}

fn write_temp_key(key_data: &[u8]) -> Result<NamedTempFile, KeyError> {
    use std::io::Write;

    // created exclusively, owner-only on unix
    let mut file = tempfile::Builder::new()
        .prefix("hostkit_ssh_key_")
        .tempfile()?;
    file.write_all(key_data)?;
    file.flush()?;

    debug!(path = %file.path().display(), "wrote temporary SSH key");
    Ok(file)
}
