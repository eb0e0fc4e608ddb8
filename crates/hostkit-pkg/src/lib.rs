//! hostkit-pkg: package and service actions on managed hosts
//!
//! Renders [`PackageAction`](hostkit_core::PackageAction) and
//! [`ServiceAction`](hostkit_core::ServiceAction) into distribution-specific
//! commands and runs them over a [`ShellClient`].

pub mod apt;
pub mod dnf;
pub mod error;
pub mod systemd;
pub mod traits;
pub mod types;
pub mod zypper;

use std::sync::Arc;

use hostkit_exec::ShellClient;
use tracing::{info, instrument};

pub use apt::AptManager;
pub use dnf::DnfManager;
pub use error::PackageError;
pub use systemd::SystemdManager;
pub use traits::{PackageManager, ServiceManager};
pub use types::{DistroFamily, OsRelease, PackageManagerType};
pub use zypper::ZypperManager;

/// Read and parse `/etc/os-release` on the host
///
/// # Errors
/// Returns `PackageError::OsRelease` if the file cannot be read
pub async fn read_os_release(client: &dyn ShellClient) -> Result<OsRelease, PackageError> {
    let content = client
        .output("cat /etc/os-release")
        .await
        .map_err(|e| PackageError::OsRelease(e.to_string()))?;
    Ok(OsRelease::parse(&content))
}

/// Pick the package manager for the host's distribution
///
/// # Errors
/// - `PackageError::OsRelease` if `/etc/os-release` cannot be read
/// - `PackageError::UnsupportedDistro` if neither `ID` nor `ID_LIKE` is known
#[instrument(skip(client))]
pub async fn detect_package_manager(
    client: Arc<dyn ShellClient>,
) -> Result<Box<dyn PackageManager>, PackageError> {
    let release = read_os_release(client.as_ref()).await?;

    let manager: Box<dyn PackageManager> = match release.family() {
        Some(DistroFamily::Debian) => Box::new(AptManager::new(client)),
        Some(DistroFamily::RedHat) => Box::new(DnfManager::detect(client).await),
        Some(DistroFamily::Suse) => Box::new(ZypperManager::new(client)),
        None => return Err(PackageError::UnsupportedDistro { id: release.id }),
    };

    info!(distro = %release.id, manager = %manager.manager_type(), "detected package manager");
    Ok(manager)
}
