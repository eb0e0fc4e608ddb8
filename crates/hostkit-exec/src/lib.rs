//! hostkit-exec: remote shell access to managed hosts
//!
//! Provides the [`ShellClient`] trait with implementations that drive the
//! system `ssh` binary or speak SSH in-process.

pub mod connection;
pub mod error;
pub mod external;
pub mod fake;
pub mod keys;
pub mod native;
pub mod traits;

pub use connection::ConnectionInfo;
pub use error::ExecError;
pub use external::{ExternalClient, find_ssh_binary};
pub use fake::{FakeClient, FakeResponse};
pub use keys::{KeyError, KeySource, ResolvedKey, check_private_key};
pub use native::{MAX_DIAL_ATTEMPTS, NativeClient};
pub use traits::{OutputStream, ShellClient};

use hostkit_core::{ClientType, SshConfig};
use tracing::debug;

/// Build the client `config` asks for
///
/// Falls back to the native client when no ssh binary is configured or
/// found on `PATH`.
///
/// # Errors
/// Returns `ExecError::SshKeyError` if a key in `info` cannot be used
pub fn new_client(
    info: ConnectionInfo,
    config: &SshConfig,
) -> Result<Box<dyn ShellClient>, ExecError> {
    let binary = config.binary.clone().or_else(find_ssh_binary);

    match (config.client, binary) {
        (ClientType::External, Some(binary)) => {
            debug!(binary = %binary.display(), "using SSH client type: external");
            Ok(Box::new(ExternalClient::new(binary, &info)?))
        }
        (ClientType::External, None) => {
            debug!("SSH binary not found, using native client");
            Ok(Box::new(NativeClient::new(info)?))
        }
        (ClientType::Native, _) => {
            debug!("using SSH client type: native");
            Ok(Box::new(NativeClient::new(info)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_native_when_configured() {
        let config = SshConfig {
            client: ClientType::Native,
            ..SshConfig::default()
        };
        let client = new_client(ConnectionInfo::from_config("h", &config), &config).unwrap();
        assert_eq!(client.client_type(), ClientType::Native);
    }

    #[test]
    fn test_new_client_uses_configured_binary() {
        let config = SshConfig {
            binary: Some("/opt/ssh/bin/ssh".into()),
            ..SshConfig::default()
        };
        let client = new_client(ConnectionInfo::from_config("h", &config), &config).unwrap();
        assert_eq!(client.client_type(), ClientType::External);
    }
}
