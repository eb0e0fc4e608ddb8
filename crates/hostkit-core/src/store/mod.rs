//! Host persistence port
//!
//! A store maps host names to whole [`Host`] records with upsert-by-name
//! semantics. Absence is reported in-band (`Ok(None)` / `Ok(false)`),
//! errors are reserved for failures of the backing medium.

mod fake;
mod memory;

pub use fake::FakeStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::{CoreError, HostError, StoreError};
use crate::host::Host;

/// Persistence port for hosts
///
/// Implementations must be safe under concurrent readers. Writers on the
/// same name are either serialized by the implementation or documented as
/// unsupported.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Whether a host with this name is persisted
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of all persisted hosts, in no particular order
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Load a host, `Ok(None)` when absent
    async fn load(&self, name: &str) -> Result<Option<Host>, StoreError>;

    /// Persist a host, replacing any record with the same name
    async fn save(&self, host: &Host) -> Result<(), StoreError>;

    /// Remove a host, absence is not an error
    async fn remove(&self, name: &str) -> Result<(), StoreError>;
}

/// Convenience operations built on any [`HostStore`]
#[async_trait]
pub trait HostStoreExt: HostStore {
    /// Load a host that must exist
    ///
    /// # Errors
    /// `HostError::HostDoesNotExist` when absent, `CoreError::Store` on medium failure
    async fn load_existing(&self, name: &str) -> Result<Host, CoreError> {
        self.load(name).await?.ok_or_else(|| {
            HostError::HostDoesNotExist {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Save a host whose name must not be taken yet
    ///
    /// Not atomic: two concurrent calls for one name can both pass the
    /// existence check.
    ///
    /// # Errors
    /// `HostError::HostAlreadyExists` when the name is taken, `CoreError::Store` on medium failure
    async fn save_new(&self, host: &Host) -> Result<(), CoreError> {
        if self.exists(&host.name).await? {
            return Err(HostError::HostAlreadyExists {
                name: host.name.clone(),
            }
            .into());
        }
        self.save(host).await?;
        Ok(())
    }
}

impl<S: HostStore + ?Sized> HostStoreExt for S {}
