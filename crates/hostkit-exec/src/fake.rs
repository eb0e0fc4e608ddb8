//! Scripted [`ShellClient`] for tests

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hostkit_core::ClientType;

use crate::error::ExecError;
use crate::traits::{OutputStream, ShellClient};

/// Recorded reply to one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeResponse {
    pub output: String,
    pub error: Option<ExecError>,
}

impl FakeResponse {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn err(error: ExecError) -> Self {
        Self {
            output: String::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    commands: Vec<String>,
    shells: Vec<Vec<String>>,
    started: bool,
}

/// Client that answers from a command → response table
///
/// Commands without a response fail with status 127. Every command and
/// shell invocation is recorded in order.
#[derive(Debug, Default)]
pub struct FakeClient {
    responses: Mutex<HashMap<String, Vec<FakeResponse>>>,
    recorded: Mutex<Recorded>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl FakeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `response`
    ///
    /// Registering the same command several times queues the responses;
    /// the last one repeats once the queue is drained.
    #[must_use]
    pub fn respond(self, command: impl Into<String>, response: FakeResponse) -> Self {
        lock(&self.responses)
            .entry(command.into())
            .or_default()
            .push(response);
        self
    }

    /// Shorthand for a successful response
    #[must_use]
    pub fn ok(self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.respond(command, FakeResponse::ok(output))
    }

    /// Commands passed to `output` and `start`, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.recorded).commands.clone()
    }

    /// Arguments of every `shell` call, in order
    pub fn shells(&self) -> Vec<Vec<String>> {
        lock(&self.recorded).shells.clone()
    }

    fn reply(&self, command: &str) -> Result<String, ExecError> {
        lock(&self.recorded).commands.push(command.to_string());

        let mut responses = lock(&self.responses);
        let Some(queue) = responses.get_mut(command) else {
            return Err(ExecError::CommandFailed {
                status: 127,
                output: format!("sh: {command}: command not found\n"),
            });
        };
        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or_default()
        };

        match response.error {
            Some(err) => Err(err),
            None => Ok(response.output),
        }
    }
}

#[async_trait]
impl ShellClient for FakeClient {
    async fn output(&self, command: &str) -> Result<String, ExecError> {
        self.reply(command)
    }

    async fn shell(&self, args: &[&str]) -> Result<(), ExecError> {
        lock(&self.recorded)
            .shells
            .push(args.iter().map(ToString::to_string).collect());
        Ok(())
    }

    async fn start(&self, command: &str) -> Result<(OutputStream, OutputStream), ExecError> {
        if lock(&self.recorded).started {
            return Err(ExecError::AlreadyStarted);
        }
        let output = self.reply(command)?;
        lock(&self.recorded).started = true;
        Ok((
            Box::new(std::io::Cursor::new(output.into_bytes())),
            Box::new(tokio::io::empty()),
        ))
    }

    async fn wait(&self) -> Result<(), ExecError> {
        let mut recorded = lock(&self.recorded);
        if !recorded.started {
            return Err(ExecError::NotStarted);
        }
        recorded.started = false;
        Ok(())
    }

    fn client_type(&self) -> ClientType {
        ClientType::External
    }
}
