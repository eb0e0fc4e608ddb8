//! Error types for hostkit-exec

use thiserror::Error;

/// Errors that can occur while running commands on a host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Failed to connect to remote host
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Command ran but exited non-zero
    #[error("command exited with status {status}")]
    CommandFailed {
        /// Exit status code, -1 when killed by a signal
        status: i32,
        /// Output captured before exit, empty for streamed commands
        output: String,
    },

    /// SSH key error
    #[error("SSH key error: {0}")]
    SshKeyError(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// `wait` called with no started command
    #[error("no command started")]
    NotStarted,

    /// `start` called while a command is still in flight
    #[error("a started command has not been waited for")]
    AlreadyStarted,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

impl ExecError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecError::ConnectionFailed(_))
    }

    /// Exit status, if the command ran to completion
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            ExecError::CommandFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        ExecError::IoError(err.to_string())
    }
}
