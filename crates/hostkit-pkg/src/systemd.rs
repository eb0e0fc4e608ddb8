//! systemd service manager

use std::sync::Arc;

use async_trait::async_trait;
use hostkit_core::ServiceAction;
use hostkit_exec::ShellClient;
use tracing::{debug, info, instrument};

use crate::error::PackageError;
use crate::traits::ServiceManager;

const DAEMON_RELOAD: &str = "sudo systemctl daemon-reload";

pub struct SystemdManager {
    client: Arc<dyn ShellClient>,
}

impl SystemdManager {
    pub fn new(client: Arc<dyn ShellClient>) -> Self {
        Self { client }
    }

    /// Commands run for `action`, in order
    #[must_use]
    pub fn commands(name: &str, action: ServiceAction) -> Vec<String> {
        match action {
            ServiceAction::DaemonReload => vec![DAEMON_RELOAD.to_string()],
            // unit files may have changed on disk since the last reload
            ServiceAction::Start | ServiceAction::Restart => vec![
                DAEMON_RELOAD.to_string(),
                format!("sudo systemctl {action} {name}"),
            ],
            ServiceAction::Stop | ServiceAction::Enable | ServiceAction::Disable => {
                vec![format!("sudo systemctl {action} {name}")]
            }
        }
    }
}

#[async_trait]
impl ServiceManager for SystemdManager {
    #[instrument(skip(self))]
    async fn service(&self, name: &str, action: ServiceAction) -> Result<(), PackageError> {
        for command in Self::commands(name, action) {
            debug!(command = %command, "running systemctl");
            self.client.output(&command).await?;
        }
        info!(service = %name, action = %action, "service action completed");
        Ok(())
    }
}
