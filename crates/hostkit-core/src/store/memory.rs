//! Thread-safe in-memory host store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::host::Host;
use crate::store::HostStore;

/// In-memory [`HostStore`]
///
/// Readers share the lock, writers are serialized by it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hosts: RwLock<HashMap<String, Host>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `hosts`
    ///
    /// Later entries win when names repeat.
    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        Self {
            hosts: RwLock::new(
                hosts
                    .into_iter()
                    .map(|host| (host.name.clone(), host))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl HostStore for MemoryStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.hosts.read().await.contains_key(name))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.hosts.read().await.keys().cloned().collect())
    }

    async fn load(&self, name: &str) -> Result<Option<Host>, StoreError> {
        Ok(self.hosts.read().await.get(name).cloned())
    }

    #[instrument(skip(self, host), fields(host = %host.name))]
    async fn save(&self, host: &Host) -> Result<(), StoreError> {
        let previous = self
            .hosts
            .write()
            .await
            .insert(host.name.clone(), host.clone());
        debug!(replaced = previous.is_some(), "saved host");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        let removed = self.hosts.write().await.remove(name);
        debug!(removed = removed.is_some(), "removed host");
        Ok(())
    }
}
