//! APT package manager (Debian/Ubuntu)

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use hostkit_core::{PackageAction, WaitPolicy, wait_for};
use hostkit_exec::{ExecError, ShellClient};
use tracing::{debug, info, instrument};

use crate::error::PackageError;
use crate::traits::PackageManager;
use crate::types::PackageManagerType;

const UPDATE_COMMAND: &str = "sudo apt-get update";

/// Marker apt prints while another process holds the dpkg lock
const LOCK_HELD: &str = "Could not get lock";

/// APT package manager implementation
pub struct AptManager {
    client: Arc<dyn ShellClient>,
    /// How long to wait for the dpkg lock
    lock_policy: WaitPolicy,
}

impl AptManager {
    pub fn new(client: Arc<dyn ShellClient>) -> Self {
        Self {
            client,
            lock_policy: WaitPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_lock_policy(mut self, policy: WaitPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Render the install/remove command for `name`
    ///
    /// Upgrade uses `install`, which upgrades an installed package in place.
    #[must_use]
    pub fn command(name: &str, action: PackageAction) -> String {
        let verb = match action {
            PackageAction::Install | PackageAction::Upgrade => "install",
            PackageAction::Remove => "remove",
        };
        format!("DEBIAN_FRONTEND=noninteractive sudo -E apt-get {verb} -y {name}")
    }

    /// Refresh package lists, retrying while the dpkg lock is held
    #[instrument(skip(self))]
    async fn update(&self) -> Result<(), PackageError> {
        let outcome: Mutex<Option<Result<String, ExecError>>> = Mutex::new(None);
        let (client, slot) = (&self.client, &outcome);

        let waited = wait_for(&self.lock_policy, || async move {
            match client.output(UPDATE_COMMAND).await {
                Err(e) if is_lock_held(&e) => {
                    debug!("apt lock held, retrying");
                    false
                }
                result => {
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
                    true
                }
            }
        })
        .await;

        if waited.is_err() {
            return Err(PackageError::LockTimeout {
                attempts: self.lock_policy.max_attempts,
            });
        }
        match outcome.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(Err(e)) => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn is_lock_held(err: &ExecError) -> bool {
    match err {
        ExecError::CommandFailed { output, .. } => output.contains(LOCK_HELD),
        other => other.to_string().contains(LOCK_HELD),
    }
}

#[async_trait]
impl PackageManager for AptManager {
    #[instrument(skip(self))]
    async fn package(&self, name: &str, action: PackageAction) -> Result<(), PackageError> {
        if action != PackageAction::Remove {
            self.update().await?;
        }

        self.client.output(&Self::command(name, action)).await?;
        info!(package = %name, action = %action, "apt package action completed");
        Ok(())
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Apt
    }
}
