//! Remote shell through the system `ssh` binary

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use hostkit_core::ClientType;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

use crate::connection::ConnectionInfo;
use crate::error::ExecError;
use crate::keys::check_private_key;
use crate::traits::{OutputStream, ShellClient};

/// Options passed to every ssh invocation
const BASE_SSH_ARGS: [&str; 20] = [
    "-F",
    "/dev/null",
    "-o",
    "ConnectionAttempts=3",
    "-o",
    "ConnectTimeout=10",
    "-o",
    "ControlMaster=no",
    "-o",
    "ControlPath=none",
    "-o",
    "LogLevel=quiet",
    "-o",
    "PasswordAuthentication=no",
    "-o",
    "ServerAliveInterval=60",
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
];

/// Find an executable `ssh` on `PATH`
#[must_use]
pub fn find_ssh_binary() -> Option<PathBuf> {
    find_in_path(&std::env::var_os("PATH")?)
}

fn find_in_path(path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join("ssh"))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// [`ShellClient`] that drives an external ssh binary
pub struct ExternalClient {
    binary: PathBuf,
    base_args: Vec<String>,
    /// Child spawned by `start`, reaped by `wait`
    started: Mutex<Option<Child>>,
}

impl std::fmt::Debug for ExternalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalClient")
            .field("binary", &self.binary)
            .field("base_args", &self.base_args)
            .finish_non_exhaustive()
    }
}

impl ExternalClient {
    /// Create a client for `info` using the ssh binary at `binary`
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if a configured key is missing,
    /// unreadable or readable by group/other
    pub fn new(binary: impl Into<PathBuf>, info: &ConnectionInfo) -> Result<Self, ExecError> {
        let mut args: Vec<String> = BASE_SSH_ARGS.iter().map(ToString::to_string).collect();
        args.push(info.destination());

        // without explicit keys ssh falls back to the agent's identities
        if info.key_paths().next().is_some() {
            args.extend(["-o".to_string(), "IdentitiesOnly=yes".to_string()]);
        }
        for key in info.key_paths() {
            check_private_key(key).map_err(|e| ExecError::SshKeyError(e.to_string()))?;
            debug!(key = %key.display(), "using SSH private key");
            args.extend(["-i".to_string(), key.display().to_string()]);
        }

        args.extend(["-p".to_string(), info.port.to_string()]);

        Ok(Self {
            binary: binary.into(),
            base_args: args,
            started: Mutex::new(None),
        })
    }

    /// Arguments placed before the remote command
    #[must_use]
    pub fn base_args(&self) -> &[String] {
        &self.base_args
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, extra: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.base_args).args(extra).kill_on_drop(true);
        cmd
    }
}

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[async_trait]
impl ShellClient for ExternalClient {
    #[instrument(skip(self), level = "debug")]
    async fn output(&self, command: &str) -> Result<String, ExecError> {
        let output = self
            .command(&[command])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let status = status_code(output.status);
            error!(command = %command, status, "command failed");
            return Err(ExecError::CommandFailed {
                status,
                output: combined,
            });
        }

        Ok(combined)
    }

    #[instrument(skip(self), level = "debug")]
    async fn shell(&self, args: &[&str]) -> Result<(), ExecError> {
        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        if !status.success() {
            return Err(ExecError::CommandFailed {
                status: status_code(status),
                output: String::new(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn start(&self, command: &str) -> Result<(OutputStream, OutputStream), ExecError> {
        let mut started = self.started.lock().await;
        if started.is_some() {
            return Err(ExecError::AlreadyStarted);
        }

        let mut child = self
            .command(&[command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExecError::IoError("child output was not piped".to_string()));
        };

        *started = Some(child);
        Ok((Box::new(stdout), Box::new(stderr)))
    }

    #[instrument(skip(self), level = "debug")]
    async fn wait(&self) -> Result<(), ExecError> {
        let mut child = self.started.lock().await.take().ok_or(ExecError::NotStarted)?;

        let status = child.wait().await?;
        debug!(status = ?status, "started command exited");

        if !status.success() {
            return Err(ExecError::CommandFailed {
                status: status_code(status),
                output: String::new(),
            });
        }
        Ok(())
    }

    fn client_type(&self) -> ClientType {
        ClientType::External
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;

    use tokio::io::AsyncReadExt;

    use super::*;

    /// Stand-in for ssh: skips options up to `-p PORT` and runs the rest locally
    const FAKE_SSH: &str = r#"#!/bin/sh
while [ "$#" -gt 0 ]; do
  if [ "$1" = "-p" ]; then shift 2; break; fi
  shift
done
exec sh -c "$*"
"#;

    fn fake_ssh() -> &'static Path {
        static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
        DIR.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("ssh");
            std::fs::write(&path, FAKE_SSH).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            dir
        })
        .path()
    }

    fn client() -> ExternalClient {
        let info = ConnectionInfo::new("127.0.0.1", "docker").with_port(2222);
        ExternalClient::new(fake_ssh().join("ssh"), &info).unwrap()
    }

    #[test]
    fn test_base_args_without_keys() {
        let args = client().base_args().to_vec();
        assert_eq!(&args[..2], ["-F", "/dev/null"]);
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(!args.contains(&"IdentitiesOnly=yes".to_string()));
        assert_eq!(&args[args.len() - 3..], ["docker@127.0.0.1", "-p", "2222"]);
    }

    #[test]
    fn test_base_args_with_key() {
        let key = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(key.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        let info = ConnectionInfo::new("h", "u").with_key(key.path());

        let client = ExternalClient::new("/usr/bin/ssh", &info).unwrap();
        let args = client.base_args();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], key.path().display().to_string());
        assert!(args.contains(&"IdentitiesOnly=yes".to_string()));
    }

    #[test]
    fn test_empty_key_path_is_skipped() {
        let info = ConnectionInfo::new("h", "u").with_key("");
        let client = ExternalClient::new("/usr/bin/ssh", &info).unwrap();
        let args = client.base_args();
        assert!(!args.contains(&"-i".to_string()));
        assert!(!args.contains(&"IdentitiesOnly=yes".to_string()));
    }

    #[test]
    fn test_find_skips_non_executable() {
        let plain = tempfile::tempdir().unwrap();
        std::fs::write(plain.path().join("ssh"), "").unwrap();
        std::fs::set_permissions(
            plain.path().join("ssh"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let path = std::env::join_paths([plain.path(), fake_ssh()]).unwrap();
        assert_eq!(find_in_path(&path), Some(fake_ssh().join("ssh")));

        let only_plain = std::env::join_paths([plain.path()]).unwrap();
        assert_eq!(find_in_path(&only_plain), None);
    }

    #[test]
    fn test_open_key_is_rejected() {
        let key = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(key.path(), std::fs::Permissions::from_mode(0o666)).unwrap();
        let info = ConnectionInfo::new("h", "u").with_key(key.path());

        let err = ExternalClient::new("/usr/bin/ssh", &info).unwrap_err();
        assert!(matches!(err, ExecError::SshKeyError(_)));
    }

    #[tokio::test]
    async fn test_output_combines_streams() {
        let out = client().output("echo out; echo err >&2").await.unwrap();
        assert_eq!(out, "out\nerr\n");
    }

    #[tokio::test]
    async fn test_output_failure_keeps_output() {
        let err = client().output("echo partial; exit 3").await.unwrap_err();
        assert_eq!(
            err,
            ExecError::CommandFailed {
                status: 3,
                output: "partial\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_shell_with_args() {
        client().shell(&["true"]).await.unwrap();
        let err = client().shell(&["exit", "4"]).await.unwrap_err();
        assert_eq!(err.exit_status(), Some(4));
    }

    #[tokio::test]
    async fn test_start_then_wait() {
        let client = client();
        let (mut stdout, mut stderr) = client.start("echo a; echo b >&2").await.unwrap();

        let mut out = String::new();
        let mut err = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        stderr.read_to_string(&mut err).await.unwrap();
        client.wait().await.unwrap();

        assert_eq!(out, "a\n");
        assert_eq!(err, "b\n");
    }

    #[tokio::test]
    async fn test_wait_reports_exit_status() {
        let client = client();
        let (mut stdout, _stderr) = client.start("exit 7").await.unwrap();
        let mut sink = Vec::new();
        stdout.read_to_end(&mut sink).await.unwrap();

        assert_eq!(client.wait().await.unwrap_err().exit_status(), Some(7));
    }

    #[tokio::test]
    async fn test_start_wait_ordering() {
        let client = client();
        assert_eq!(client.wait().await, Err(ExecError::NotStarted));

        let _streams = client.start("true").await.unwrap();
        assert!(matches!(
            client.start("true").await,
            Err(ExecError::AlreadyStarted)
        ));
        client.wait().await.unwrap();
        assert_eq!(client.wait().await, Err(ExecError::NotStarted));
    }
}
