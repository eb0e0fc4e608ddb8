//! Zypper package manager (openSUSE/SLES)

use std::sync::Arc;

use async_trait::async_trait;
use hostkit_core::PackageAction;
use hostkit_exec::ShellClient;
use tracing::{info, instrument};

use crate::error::PackageError;
use crate::traits::PackageManager;
use crate::types::PackageManagerType;

pub struct ZypperManager {
    client: Arc<dyn ShellClient>,
}

impl ZypperManager {
    pub fn new(client: Arc<dyn ShellClient>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn command(name: &str, action: PackageAction) -> String {
        format!("sudo -E zypper -n {action} {name}")
    }
}

#[async_trait]
impl PackageManager for ZypperManager {
    #[instrument(skip(self))]
    async fn package(&self, name: &str, action: PackageAction) -> Result<(), PackageError> {
        self.client.output(&Self::command(name, action)).await?;
        info!(package = %name, action = %action, "zypper package action completed");
        Ok(())
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Zypper
    }
}
