//! DNF/YUM package manager (Fedora/RHEL/CentOS)

use std::sync::Arc;

use async_trait::async_trait;
use hostkit_core::PackageAction;
use hostkit_exec::ShellClient;
use tracing::{debug, info, instrument};

use crate::error::PackageError;
use crate::traits::PackageManager;
use crate::types::PackageManagerType;

/// DNF package manager implementation
///
/// Drives `yum` instead on hosts that predate dnf.
pub struct DnfManager {
    client: Arc<dyn ShellClient>,
    /// Whether to use yum instead of dnf
    use_yum: bool,
}

impl DnfManager {
    pub fn new(client: Arc<dyn ShellClient>) -> Self {
        Self {
            client,
            use_yum: false,
        }
    }

    pub fn yum(client: Arc<dyn ShellClient>) -> Self {
        Self {
            client,
            use_yum: true,
        }
    }

    /// Pick dnf when the host has it, yum otherwise
    #[instrument(skip(client))]
    pub async fn detect(client: Arc<dyn ShellClient>) -> Self {
        let has_dnf = client.output("command -v dnf").await.is_ok();
        debug!(has_dnf, "checked for dnf");
        if has_dnf {
            Self::new(client)
        } else {
            Self::yum(client)
        }
    }

    fn tool(&self) -> &'static str {
        if self.use_yum { "yum" } else { "dnf" }
    }

    #[must_use]
    pub fn command(&self, name: &str, action: PackageAction) -> String {
        format!("sudo -E {} {action} -y {name}", self.tool())
    }
}

#[async_trait]
impl PackageManager for DnfManager {
    #[instrument(skip(self), fields(tool = self.tool()))]
    async fn package(&self, name: &str, action: PackageAction) -> Result<(), PackageError> {
        self.client.output(&self.command(name, action)).await?;
        info!(package = %name, action = %action, "package action completed");
        Ok(())
    }

    fn manager_type(&self) -> PackageManagerType {
        if self.use_yum {
            PackageManagerType::Yum
        } else {
            PackageManagerType::Dnf
        }
    }
}

#[cfg(test)]
mod tests {
    use hostkit_exec::FakeClient;

    use super::*;

    #[test]
    fn test_commands() {
        let client: Arc<dyn ShellClient> = Arc::new(FakeClient::new());
        let dnf = DnfManager::new(client.clone());
        let yum = DnfManager::yum(client);

        assert_eq!(
            dnf.command("vim", PackageAction::Install),
            "sudo -E dnf install -y vim"
        );
        assert_eq!(
            yum.command("vim", PackageAction::Remove),
            "sudo -E yum remove -y vim"
        );
        assert_eq!(
            yum.command("vim", PackageAction::Upgrade),
            "sudo -E yum upgrade -y vim"
        );
    }

    #[tokio::test]
    async fn test_detect() {
        let with_dnf: Arc<dyn ShellClient> =
            Arc::new(FakeClient::new().ok("command -v dnf", "/usr/bin/dnf\n"));
        assert_eq!(
            DnfManager::detect(with_dnf).await.manager_type(),
            PackageManagerType::Dnf
        );

        let without: Arc<dyn ShellClient> = Arc::new(FakeClient::new());
        assert_eq!(
            DnfManager::detect(without).await.manager_type(),
            PackageManagerType::Yum
        );
    }

    #[tokio::test]
    async fn test_package_runs_command() {
        let client = Arc::new(FakeClient::new().ok("sudo -E dnf upgrade -y kernel", ""));
        DnfManager::new(client.clone())
            .package("kernel", PackageAction::Upgrade)
            .await
            .unwrap();
        assert_eq!(client.commands(), vec!["sudo -E dnf upgrade -y kernel"]);
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let client = Arc::new(FakeClient::new());
        let err = DnfManager::new(client)
            .package("nope", PackageAction::Install)
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::Exec(_)));
    }
}
