//! Fault-injecting host store for tests

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::host::Host;
use crate::store::HostStore;

/// Test double backed by a plain list of hosts
///
/// Each operation returns its injected error unchanged, without touching
/// the host list, when one is set. Meant to be driven sequentially.
#[derive(Debug, Default)]
pub struct FakeStore {
    pub hosts: Mutex<Vec<Host>>,
    /// Error returned by `exists`
    pub exists_err: Option<StoreError>,
    /// Error returned by `list`
    pub list_err: Option<StoreError>,
    /// Error returned by `load`
    pub load_err: Option<StoreError>,
    /// Error returned by `save`
    pub save_err: Option<StoreError>,
    /// Error returned by `remove`
    pub remove_err: Option<StoreError>,
}

impl FakeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        Self {
            hosts: Mutex::new(hosts.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Snapshot of the stored hosts, in insertion order
    #[must_use]
    pub fn hosts(&self) -> Vec<Host> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Host>> {
        // a panicking test must not hide the store from the next assertion
        self.hosts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn injected(err: &Option<StoreError>) -> Result<(), StoreError> {
        match err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HostStore for FakeStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Self::injected(&self.exists_err)?;
        Ok(self.lock().iter().any(|host| host.name == name))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Self::injected(&self.list_err)?;
        Ok(self.lock().iter().map(|host| host.name.clone()).collect())
    }

    async fn load(&self, name: &str) -> Result<Option<Host>, StoreError> {
        Self::injected(&self.load_err)?;
        Ok(self.lock().iter().find(|host| host.name == name).cloned())
    }

    async fn save(&self, host: &Host) -> Result<(), StoreError> {
        Self::injected(&self.save_err)?;
        let mut hosts = self.lock();
        match hosts.iter_mut().find(|existing| existing.name == host.name) {
            Some(existing) => *existing = host.clone(),
            None => hosts.push(host.clone()),
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), StoreError> {
        Self::injected(&self.remove_err)?;
        self.lock().retain(|host| host.name != name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn host(name: &str) -> Host {
        Host::new(name, "none").unwrap()
    }

    fn names(list: Vec<String>) -> HashSet<String> {
        list.into_iter().collect()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = FakeStore::new();
        assert!(!store.exists("a").await.unwrap());
        assert_eq!(store.list().await.unwrap(), Vec::<String>::new());
        assert_eq!(store.load("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_exists_load_remove() {
        let store = FakeStore::new();
        let h = host("a");

        store.save(&h).await.unwrap();
        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.load("a").await.unwrap(), Some(h));

        store.remove("a").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_tracks_saves_and_removes() {
        let store = FakeStore::with_hosts([host("a")]);

        store.save(&host("b")).await.unwrap();
        assert_eq!(
            names(store.list().await.unwrap()),
            names(vec!["a".to_string(), "b".to_string()])
        );

        store.remove("a").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_save_replaces_same_name() {
        let store = FakeStore::with_hosts([host("a")]);
        let updated = host("a").with_driver_config(serde_json::json!("x"));
        store.save(&updated).await.unwrap();
        assert_eq!(store.hosts(), vec![updated]);
    }

    #[tokio::test]
    async fn test_injected_errors_are_returned_unchanged() {
        let err = StoreError::Io("disk gone".to_string());
        let store = FakeStore {
            exists_err: Some(err.clone()),
            list_err: Some(err.clone()),
            load_err: Some(err.clone()),
            save_err: Some(err.clone()),
            remove_err: Some(err.clone()),
            ..FakeStore::with_hosts([host("a")])
        };

        assert_eq!(store.exists("a").await, Err(err.clone()));
        assert_eq!(store.list().await, Err(err.clone()));
        assert_eq!(store.load("a").await, Err(err.clone()));
        assert_eq!(store.save(&host("b")).await, Err(err.clone()));
        assert_eq!(store.remove("a").await, Err(err));

        // failed writes never reached the host list
        assert_eq!(store.hosts(), vec![host("a")]);
    }

    #[tokio::test]
    async fn test_injection_is_per_operation() {
        let store = FakeStore {
            save_err: Some(StoreError::Unavailable("read-only".to_string())),
            ..FakeStore::with_hosts([host("a")])
        };
        assert!(store.save(&host("b")).await.is_err());
        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.list().await.unwrap(), vec!["a".to_string()]);
    }
}
