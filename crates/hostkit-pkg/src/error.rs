//! Error types for hostkit-pkg

use hostkit_exec::ExecError;
use thiserror::Error;

/// Errors that can occur during package and service operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageError {
    /// No package manager is known for this distribution
    #[error("unsupported distribution: {id:?}")]
    UnsupportedDistro {
        /// `ID` from os-release, empty if missing
        id: String,
    },

    /// The apt/dpkg lock stayed held for every attempt
    #[error("Failed to obtain apt-get update lock after {attempts} attempts")]
    LockTimeout {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// `/etc/os-release` could not be read
    #[error("cannot read os-release: {0}")]
    OsRelease(String),

    /// Remote command failed
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl PackageError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            PackageError::LockTimeout { .. } => true,
            PackageError::Exec(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_error_is_transparent() {
        let err = PackageError::from(ExecError::CommandFailed {
            status: 100,
            output: String::new(),
        });
        assert_eq!(err.to_string(), "command exited with status 100");
    }

    #[test]
    fn test_retryable() {
        assert!(PackageError::LockTimeout { attempts: 3 }.is_retryable());
        assert!(PackageError::Exec(ExecError::ConnectionFailed("x".into())).is_retryable());
        assert!(
            !PackageError::UnsupportedDistro {
                id: "arch".into()
            }
            .is_retryable()
        );
    }
}
