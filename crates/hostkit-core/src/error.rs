//! Error types for hostkit-core

use std::error::Error as StdError;

use thiserror::Error;

use crate::state::State;

/// Boxed cause carried by errors that wrap another failure
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Host lifecycle errors
///
/// Callers recognize a failure by its variant, never by its message.
#[derive(Error, Debug)]
pub enum HostError {
    /// Hostname contains characters outside `0-9a-zA-Z . -`
    #[error("Invalid hostname specified. Allowed hostname chars are: 0-9a-zA-Z . -")]
    InvalidHostname,

    /// No host with this name in the referenced store
    #[error(
        "Machine {name:?} does not exist. Use \"hostkit ls\" to list machines. Use \"hostkit create\" to add a new one."
    )]
    HostDoesNotExist {
        /// Requested host name
        name: String,
    },

    /// A host with this name is already present
    #[error("Host already exists: {name:?}")]
    HostAlreadyExists {
        /// Conflicting host name
        name: String,
    },

    /// Creation preflight failed
    #[error("Error with pre-create check: {:?}", .cause.to_string())]
    DuringPreCreate {
        /// Failure reported by the preflight check
        #[source]
        cause: BoxError,
    },

    /// Transition would be a no-op
    #[error("Machine {name:?} is already {}.", .state.as_str().to_lowercase())]
    HostAlreadyInState {
        /// Host name
        name: String,
        /// State the host is already in
        state: State,
    },
}

/// How a caller should treat a [`HostError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bad input, the caller can correct it and retry
    Input,
    /// Reports absence, nothing failed
    Informational,
    /// Operation was a no-op
    Advisory,
    /// Current attempt cannot continue
    Fatal,
}

impl HostError {
    /// Wrap a preflight failure
    pub fn during_pre_create(cause: impl Into<BoxError>) -> Self {
        HostError::DuringPreCreate {
            cause: cause.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            HostError::InvalidHostname | HostError::HostAlreadyExists { .. } => Severity::Input,
            HostError::HostDoesNotExist { .. } => Severity::Informational,
            HostError::HostAlreadyInState { .. } => Severity::Advisory,
            HostError::DuringPreCreate { .. } => Severity::Fatal,
        }
    }

    /// Host name this error refers to, if any
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        match self {
            HostError::HostDoesNotExist { name }
            | HostError::HostAlreadyExists { name }
            | HostError::HostAlreadyInState { name, .. } => Some(name),
            HostError::InvalidHostname | HostError::DuringPreCreate { .. } => None,
        }
    }

    /// Underlying preflight failure, if this is `DuringPreCreate`
    #[must_use]
    pub fn pre_create_cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            HostError::DuringPreCreate { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Host store medium failures
///
/// Absence of a host is never reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backing medium could not be read or written
    #[error("store I/O error: {0}")]
    Io(String),

    /// Stored representation could not be decoded
    #[error("stored host {name:?} is corrupt: {reason}")]
    Corrupt {
        /// Host name
        name: String,
        /// Decoder message
        reason: String,
    },

    /// Store is not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Unavailable(_))
    }
}

/// Failures reported by a driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Driver does not implement the operation
    #[error("{driver} driver does not support {operation}")]
    Unsupported {
        /// Driver name
        driver: String,
        /// Operation name
        operation: &'static str,
    },

    /// Driver operation failed
    #[error("driver error: {0}")]
    Failed(String),

    /// Host state could not be determined
    #[error("could not get host state: {0}")]
    StateUnknown(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Logging could not be initialized
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Errors returned by the lifecycle helpers
#[derive(Error, Debug)]
pub enum CoreError {
    /// Host lifecycle error
    #[error(transparent)]
    Host(#[from] HostError),

    /// Store medium failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Driver failure
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Waited the maximum number of attempts
    #[error("Maximum number of retries ({attempts}) exceeded")]
    Timeout {
        /// Attempts made
        attempts: u32,
    },

    /// Provider reported it cannot create hosts right now
    #[error("provider {0:?} is not available")]
    ProviderUnavailable(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Borrow the host error, if this is one
    #[must_use]
    pub fn as_host_error(&self) -> Option<&HostError> {
        match self {
            CoreError::Host(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_hostname_message() {
        assert_eq!(
            HostError::InvalidHostname.to_string(),
            "Invalid hostname specified. Allowed hostname chars are: 0-9a-zA-Z . -"
        );
    }

    #[test]
    fn test_already_in_state_message() {
        let err = HostError::HostAlreadyInState {
            name: "m".to_string(),
            state: State::Running,
        };
        assert_eq!(err.to_string(), "Machine \"m\" is already running.");
    }

    #[test]
    fn test_does_not_exist_message() {
        let msg = HostError::HostDoesNotExist {
            name: "m".to_string(),
        }
        .to_string();
        assert!(msg.contains("\"m\""));
        assert!(msg.contains("ls"));
        assert!(msg.contains("create"));
    }

    #[test]
    fn test_already_exists_message() {
        let err = HostError::HostAlreadyExists {
            name: "dev".to_string(),
        };
        assert_eq!(err.to_string(), "Host already exists: \"dev\"");
    }

    #[test]
    fn test_pre_create_wraps_cause() {
        let cause = DriverError::Failed("no credentials".to_string());
        let err = HostError::during_pre_create(cause.clone());

        assert_eq!(
            err.to_string(),
            "Error with pre-create check: \"driver error: no credentials\""
        );

        let source = StdError::source(&err).unwrap();
        assert_eq!(source.downcast_ref::<DriverError>(), Some(&cause));
        assert!(err.pre_create_cause().is_some());
    }

    #[test]
    fn test_severity() {
        assert_eq!(HostError::InvalidHostname.severity(), Severity::Input);
        assert_eq!(
            HostError::HostDoesNotExist {
                name: "a".to_string()
            }
            .severity(),
            Severity::Informational
        );
        assert_eq!(
            HostError::HostAlreadyInState {
                name: "a".to_string(),
                state: State::Stopped
            }
            .severity(),
            Severity::Advisory
        );
        assert_eq!(
            HostError::during_pre_create("boom").severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn test_host_name_accessor() {
        let err = HostError::HostAlreadyExists {
            name: "web".to_string(),
        };
        assert_eq!(err.host_name(), Some("web"));
        assert_eq!(HostError::InvalidHostname.host_name(), None);
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: CoreError = HostError::InvalidHostname.into();
        assert_eq!(err.to_string(), HostError::InvalidHostname.to_string());
        assert!(err.as_host_error().is_some());
    }
}
