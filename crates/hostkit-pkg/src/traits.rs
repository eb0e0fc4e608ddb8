//! Package and service manager traits

use async_trait::async_trait;
use hostkit_core::{PackageAction, ServiceAction};

use crate::error::PackageError;
use crate::types::PackageManagerType;

/// Installs, removes and upgrades packages on a host
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn package(&self, name: &str, action: PackageAction) -> Result<(), PackageError>;

    fn manager_type(&self) -> PackageManagerType;
}

/// Controls system services on a host
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Apply `action` to service `name`
    ///
    /// `name` is ignored for `ServiceAction::DaemonReload`.
    async fn service(&self, name: &str, action: ServiceAction) -> Result<(), PackageError>;
}
