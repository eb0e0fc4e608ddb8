//! Provider port: host factories
//!
//! Callers obtain a provider, check [`Provider::is_valid`], call
//! [`Provider::create`] and persist the result. [`create_host`] runs that
//! whole flow against a store.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::driver::Driver;
use crate::error::{CoreError, HostError};
use crate::host::Host;
use crate::store::{HostStore, HostStoreExt};

/// Produces new hosts
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Name of the host `create` will produce, when known up front
    fn host_name(&self) -> Option<&str> {
        None
    }

    /// Whether `create` has a reasonable chance of succeeding right now
    ///
    /// Must not have side effects beyond reading the environment.
    fn is_valid(&self) -> bool;

    /// Produce a new host
    ///
    /// Preflight failures surface as `HostError::DuringPreCreate`.
    async fn create(&self) -> Result<Host, CoreError>;
}

type ReadinessProbe = Box<dyn Fn() -> bool + Send + Sync>;

/// [`Provider`] that creates hosts through a [`Driver`]
pub struct DriverProvider<D> {
    driver: D,
    probe: ReadinessProbe,
}

impl<D: Driver> DriverProvider<D> {
    /// Wrap a driver, treating the environment as always ready
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            probe: Box::new(|| true),
        }
    }

    /// Replace the readiness probe used by `is_valid`
    #[must_use]
    pub fn with_probe(mut self, probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

#[async_trait]
impl<D: Driver> Provider for DriverProvider<D> {
    fn name(&self) -> &str {
        self.driver.driver_name()
    }

    fn host_name(&self) -> Option<&str> {
        Some(self.driver.machine_name())
    }

    fn is_valid(&self) -> bool {
        (self.probe)()
    }

    #[instrument(skip(self), fields(driver = %self.driver.driver_name(), machine = %self.driver.machine_name()))]
    async fn create(&self) -> Result<Host, CoreError> {
        let host = Host::new(self.driver.machine_name(), self.driver.driver_name())?;

        info!("running pre-create checks");
        self.driver
            .pre_create_check()
            .await
            .map_err(HostError::during_pre_create)?;

        info!("creating machine");
        self.driver.create().await?;

        Ok(host.with_driver_config(self.driver.config()))
    }
}

/// Create a host with `provider` and save it in `store`
///
/// The name checks and the save are separate store calls, so concurrent
/// creates of the same name are unsupported; callers serialize them.
///
/// # Errors
/// - `CoreError::ProviderUnavailable` if the provider reports it is not valid
/// - `HostError::HostAlreadyExists` if the name is taken, checked before
///   creation when the provider knows the name and again before saving
/// - whatever `Provider::create` or the store return
#[instrument(skip_all, fields(provider = %provider.name()))]
pub async fn create_host<P, S>(provider: &P, store: &S) -> Result<Host, CoreError>
where
    P: Provider + ?Sized,
    S: HostStore + ?Sized,
{
    if !provider.is_valid() {
        warn!("provider is not valid, refusing to create");
        return Err(CoreError::ProviderUnavailable(provider.name().to_string()));
    }

    if let Some(name) = provider.host_name()
        && store.exists(name).await?
    {
        return Err(HostError::HostAlreadyExists {
            name: name.to_string(),
        }
        .into());
    }

    let host = provider.create().await?;
    store.save_new(&host).await?;

    info!(host = %host.name, "host created and saved");
    Ok(host)
}
