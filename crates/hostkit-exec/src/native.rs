//! In-process SSH client using the russh crate

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::terminal;
use hostkit_core::{ClientType, WaitPolicy};
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect, client};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::connection::ConnectionInfo;
use crate::error::ExecError;
use crate::keys::KeySource;
use crate::traits::{OutputStream, ShellClient};

/// Connection attempts before giving up on a host
pub const MAX_DIAL_ATTEMPTS: u32 = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffer size of the pipes handed out by `start`
const PIPE_CAPACITY: usize = 64 * 1024;

/// Fallback terminal size when stdin is not a terminal
const DEFAULT_TERM_SIZE: (u16, u16) = (80, 24);

type Session = client::Handle<SshClientHandler>;

#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // same trust model as StrictHostKeyChecking=no
        Ok(true)
    }
}

/// [`ShellClient`] speaking SSH in-process
///
/// Every operation opens its own connection. A started command keeps its
/// connection until `wait` returns.
pub struct NativeClient {
    info: ConnectionInfo,
    keys: Vec<Arc<ssh_key::PrivateKey>>,
    config: Arc<client::Config>,
    dial_policy: WaitPolicy,
    started: Mutex<Option<JoinHandle<Result<(), ExecError>>>>,
}

impl std::fmt::Debug for NativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeClient")
            .field("info", &self.info)
            .field("keys", &self.keys.len())
            .field("dial_policy", &self.dial_policy)
            .finish_non_exhaustive()
    }
}

impl NativeClient {
    /// Create a client for `info`, loading every key it lists
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if a key is missing, too open or
    /// cannot be parsed
    pub fn new(info: ConnectionInfo) -> Result<Self, ExecError> {
        let mut client = Self {
            keys: Vec::with_capacity(info.keys.len()),
            info,
            config: Arc::new(client::Config::default()),
            dial_policy: WaitPolicy::new(MAX_DIAL_ATTEMPTS, Duration::from_secs(3)),
            started: Mutex::new(None),
        };

        let paths: Vec<PathBuf> = client.info.key_paths().map(Path::to_path_buf).collect();
        for path in paths {
            client.add_key(&KeySource::Path(path))?;
        }
        Ok(client)
    }

    /// Add a key from any [`KeySource`]
    ///
    /// # Errors
    /// Returns `ExecError::SshKeyError` if the key cannot be resolved or parsed
    pub fn with_key_source(mut self, source: &KeySource) -> Result<Self, ExecError> {
        self.add_key(source)?;
        Ok(self)
    }

    /// Override how often and how long to retry the initial connection
    #[must_use]
    pub fn with_dial_policy(mut self, policy: WaitPolicy) -> Self {
        self.dial_policy = policy;
        self
    }

    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn add_key(&mut self, source: &KeySource) -> Result<(), ExecError> {
        // temp files from env keys only live until the key is in memory
        let resolved = source
            .resolve()
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;
        let key = load_secret_key(resolved.path(), None)
            .map_err(|e| ExecError::SshKeyError(e.to_string()))?;
        self.keys.push(Arc::new(key));
        Ok(())
    }

    async fn dial(&self) -> Result<Session, ExecError> {
        let addr = (self.info.host.as_str(), self.info.port);
        let mut last_error = String::new();

        for attempt in 1..=self.dial_policy.max_attempts {
            let connect = client::connect(self.config.clone(), addr, SshClientHandler);
            match timeout(CONNECT_TIMEOUT, connect).await {
                Ok(Ok(session)) => return Ok(session),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("timed out after {CONNECT_TIMEOUT:?}"),
            }
            debug!(attempt, host = %self.info.host, error = %last_error, "error dialing SSH");
            if attempt < self.dial_policy.max_attempts {
                tokio::time::sleep(self.dial_policy.interval).await;
            }
        }

        Err(ExecError::ConnectionFailed(format!(
            "{}:{}: {last_error}",
            self.info.host, self.info.port
        )))
    }

    async fn authenticate(&self, session: &mut Session) -> Result<(), ExecError> {
        if self.keys.is_empty() {
            return Err(ExecError::AuthenticationFailed(
                "no private keys configured".to_string(),
            ));
        }

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .ok()
            .flatten()
            .flatten();

        for key in &self.keys {
            let auth_res = session
                .authenticate_publickey(
                    &self.info.user,
                    PrivateKeyWithHashAlg::new(key.clone(), hash_alg),
                )
                .await
                .map_err(|e| ExecError::AuthenticationFailed(e.to_string()))?;

            if auth_res.success() {
                return Ok(());
            }
        }

        Err(ExecError::AuthenticationFailed(
            "public key authentication failed".to_string(),
        ))
    }

    /// Connect, authenticate and open a session channel
    #[instrument(skip(self), fields(host = %self.info.host, port = self.info.port))]
    async fn open(&self) -> Result<(Session, Channel<client::Msg>), ExecError> {
        let mut session = self.dial().await?;
        self.authenticate(&mut session).await?;
        info!(user = %self.info.user, "SSH connected and authenticated");

        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        Ok((session, channel))
    }
}

async fn close(session: Session) {
    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        debug!(error = %e, "SSH disconnect failed");
    }
}

fn exit_result(status: i32, output: String) -> Result<(), ExecError> {
    if status == 0 {
        Ok(())
    } else {
        Err(ExecError::CommandFailed { status, output })
    }
}

/// Write to a pipe whose reader may already be gone
async fn forward(pipe: &mut (impl AsyncWrite + Unpin), data: &[u8], open: &mut bool) {
    if *open && pipe.write_all(data).await.is_err() {
        *open = false;
    }
}

/// Drain a channel into two pipes, returning the exit status
async fn pump(
    mut channel: Channel<client::Msg>,
    mut stdout: DuplexStream,
    mut stderr: DuplexStream,
) -> i32 {
    let mut status = -1;
    let (mut out_open, mut err_open) = (true, true);

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { data } => forward(&mut stdout, &data, &mut out_open).await,
            ChannelMsg::ExtendedData { data, ext: 1 } => {
                forward(&mut stderr, &data, &mut err_open).await;
            }
            ChannelMsg::ExitStatus { exit_status } => status = exit_status.cast_signed(),
            _ => {}
        }
    }
    status
}

/// Restores cooked mode on drop
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, ExecError> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

#[async_trait]
impl ShellClient for NativeClient {
    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn output(&self, command: &str) -> Result<String, ExecError> {
        let (session, mut channel) = self.open().await?;
        debug!(command = %command, "executing remote command");

        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let mut status = -1;
        let mut output = Vec::new();
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } | ChannelMsg::ExtendedData { data, ext: 1 } => {
                    output.extend_from_slice(&data);
                }
                ChannelMsg::ExitStatus { exit_status } => status = exit_status.cast_signed(),
                _ => {}
            }
        }
        close(session).await;

        debug!(command = %command, status, "remote command completed");
        let output = String::from_utf8_lossy(&output).into_owned();
        exit_result(status, output.clone())?;
        Ok(output)
    }

    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn shell(&self, args: &[&str]) -> Result<(), ExecError> {
        let (session, mut channel) = self.open().await?;

        let interactive = std::io::stdin().is_terminal();
        let (width, height) = if interactive {
            terminal::size().unwrap_or(DEFAULT_TERM_SIZE)
        } else {
            DEFAULT_TERM_SIZE
        };
        let _raw = if interactive {
            Some(RawModeGuard::enable()?)
        } else {
            None
        };

        channel
            .request_pty(false, "xterm", width.into(), height.into(), 0, 0, &[])
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        if args.is_empty() {
            channel
                .request_shell(true)
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
        } else {
            channel
                .exec(true, args.join(" "))
                .await
                .map_err(|e| ExecError::IoError(e.to_string()))?;
        }

        let mut stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        let mut buf = vec![0u8; 1024];
        let mut stdin_closed = false;
        let mut status = -1;

        loop {
            tokio::select! {
                read = stdin.read(&mut buf), if !stdin_closed => {
                    match read? {
                        0 => {
                            stdin_closed = true;
                            channel.eof().await.map_err(|e| ExecError::IoError(e.to_string()))?;
                        }
                        n => channel
                            .data(&buf[..n])
                            .await
                            .map_err(|e| ExecError::IoError(e.to_string()))?,
                    }
                }
                msg = channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { data }) => {
                            stdout.write_all(&data).await?;
                            stdout.flush().await?;
                        }
                        Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                            stderr.write_all(&data).await?;
                            stderr.flush().await?;
                        }
                        Some(ChannelMsg::ExitStatus { exit_status }) => {
                            status = exit_status.cast_signed();
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }
        close(session).await;

        exit_result(status, String::new())
    }

    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn start(&self, command: &str) -> Result<(OutputStream, OutputStream), ExecError> {
        let mut started = self.started.lock().await;
        if started.is_some() {
            return Err(ExecError::AlreadyStarted);
        }

        let (session, channel) = self.open().await?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let (out_writer, out_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (err_writer, err_reader) = tokio::io::duplex(PIPE_CAPACITY);

        *started = Some(tokio::spawn(async move {
            let status = pump(channel, out_writer, err_writer).await;
            close(session).await;
            debug!(status, "started command exited");
            exit_result(status, String::new())
        }));

        Ok((Box::new(out_reader), Box::new(err_reader)))
    }

    #[instrument(skip(self), fields(host = %self.info.host))]
    async fn wait(&self) -> Result<(), ExecError> {
        let handle = self.started.lock().await.take().ok_or(ExecError::NotStarted)?;
        handle
            .await
            .map_err(|e| ExecError::IoError(format!("output task failed: {e}")))?
    }

    fn client_type(&self) -> ClientType {
        ClientType::Native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_rejected() {
        let info = ConnectionInfo::new("localhost", "docker").with_key("/nonexistent/id_rsa");
        let err = NativeClient::new(info).unwrap_err();
        assert!(matches!(err, ExecError::SshKeyError(_)));
    }

    #[test]
    fn test_garbage_key_is_rejected() {
        let key = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(key.path(), "not a key").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(key.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        let info = ConnectionInfo::new("localhost", "docker").with_key(key.path());
        let err = NativeClient::new(info).unwrap_err();
        assert!(matches!(err, ExecError::SshKeyError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        // nothing listens on port 1
        let info = ConnectionInfo::new("127.0.0.1", "docker").with_port(1);
        let client = NativeClient::new(info)
            .unwrap()
            .with_dial_policy(WaitPolicy::new(2, Duration::from_millis(1)));

        let err = client.output("true").await.unwrap_err();
        assert!(matches!(err, ExecError::ConnectionFailed(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_wait_without_start() {
        let client = NativeClient::new(ConnectionInfo::new("localhost", "docker")).unwrap();
        assert_eq!(client.wait().await, Err(ExecError::NotStarted));
        assert_eq!(client.client_type(), ClientType::Native);
    }

    #[tokio::test]
    async fn test_forward_writes_to_pipe() {
        let (mut out_w, mut out_r) = tokio::io::duplex(16);
        let mut open = true;
        forward(&mut out_w, b"abc", &mut open).await;
        drop(out_w);

        let mut got = String::new();
        out_r.read_to_string(&mut got).await.unwrap();
        assert_eq!(got, "abc");
        assert!(open);
    }

    #[tokio::test]
    async fn test_forward_tolerates_dropped_reader() {
        let (mut w, r) = tokio::io::duplex(16);
        drop(r);
        let mut open = true;
        forward(&mut w, b"abc", &mut open).await;
        assert!(!open);
        forward(&mut w, b"more", &mut open).await;
    }
}
