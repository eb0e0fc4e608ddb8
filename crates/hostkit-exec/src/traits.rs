//! Remote shell trait

use async_trait::async_trait;
use hostkit_core::ClientType;
use tokio::io::AsyncRead;

use crate::error::ExecError;

/// Readable stream returned by [`ShellClient::start`]
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// SSH-like access to a host
///
/// `start` must be followed by draining both streams and then `wait`.
/// At most one started command is in flight per client. `output` and
/// `shell` do not interact with that state.
#[async_trait]
pub trait ShellClient: Send + Sync {
    /// Run a command to completion and return its combined output
    async fn output(&self, command: &str) -> Result<String, ExecError>;

    /// Run an interactive session, or `args` joined as one command
    async fn shell(&self, args: &[&str]) -> Result<(), ExecError>;

    /// Start a command and return its (stdout, stderr) streams
    async fn start(&self, command: &str) -> Result<(OutputStream, OutputStream), ExecError>;

    /// Wait for the started command to exit
    async fn wait(&self) -> Result<(), ExecError>;

    fn client_type(&self) -> ClientType;
}
