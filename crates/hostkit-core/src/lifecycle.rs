//! State-driven host operations
//!
//! Wraps a [`Driver`] action so it is skipped when the host is already in
//! the target state, and waits for the state to be reached otherwise.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::config::WaitConfig;
use crate::driver::Driver;
use crate::error::{CoreError, DriverError, HostError};
use crate::fields::Fields;
use crate::state::State;

/// How long to poll for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Number of probes before giving up
    pub max_attempts: u32,
    /// Delay between probes
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&WaitConfig::default())
    }
}

impl From<&WaitConfig> for WaitPolicy {
    fn from(config: &WaitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            interval: config.interval(),
        }
    }
}

impl WaitPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Poll `probe` until it returns true
///
/// # Errors
/// Returns `CoreError::Timeout` once `policy.max_attempts` probes failed
pub async fn wait_for<F, Fut>(policy: &WaitPolicy, mut probe: F) -> Result<(), CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.max_attempts {
        if probe().await {
            return Ok(());
        }
        debug!(attempt, max_attempts = policy.max_attempts, "condition not met");
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(CoreError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// Whether the driver currently reports `desired`
///
/// A failed state query counts as "not in state".
pub async fn machine_in_state(driver: &dyn Driver, desired: State) -> bool {
    match driver.state().await {
        Ok(current) => current == desired,
        Err(e) => {
            debug!(machine = %driver.machine_name(), error = %e, "state query failed");
            false
        }
    }
}

/// Lifecycle operations for one named host
pub struct Lifecycle<'a> {
    name: &'a str,
    driver: &'a dyn Driver,
    policy: WaitPolicy,
}

impl<'a> Lifecycle<'a> {
    pub fn new(name: &'a str, driver: &'a dyn Driver, policy: WaitPolicy) -> Self {
        Self {
            name,
            driver,
            policy,
        }
    }

    fn fields(&self) -> Fields {
        Fields::new()
            .with("machine", self.name)
            .with("driver", self.driver.driver_name())
    }

    /// Run `action` unless the host already reports `desired`, then wait for it
    async fn run_action_for_state<F, Fut>(&self, action: F, desired: State) -> Result<(), CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), DriverError>>,
    {
        if machine_in_state(self.driver, desired).await {
            return Err(HostError::HostAlreadyInState {
                name: self.name.to_string(),
                state: desired,
            }
            .into());
        }

        action().await?;

        wait_for(&self.policy, || machine_in_state(self.driver, desired)).await
    }

    /// Start the host and wait for `Running`
    ///
    /// # Errors
    /// `HostError::HostAlreadyInState` if already running, driver and timeout errors otherwise
    #[instrument(skip(self), fields(machine = %self.name))]
    pub async fn start(&self) -> Result<(), CoreError> {
        info!(fields = %self.fields(), "starting");
        self.run_action_for_state(|| self.driver.start(), State::Running)
            .await?;
        info!(fields = %self.fields(), "machine was started");
        Ok(())
    }

    /// Stop the host and wait for `Stopped`
    ///
    /// # Errors
    /// `HostError::HostAlreadyInState` if already stopped, driver and timeout errors otherwise
    #[instrument(skip(self), fields(machine = %self.name))]
    pub async fn stop(&self) -> Result<(), CoreError> {
        info!(fields = %self.fields(), "stopping");
        self.run_action_for_state(|| self.driver.stop(), State::Stopped)
            .await?;
        info!(fields = %self.fields(), "machine was stopped");
        Ok(())
    }

    /// Force the host off and wait for `Stopped`
    ///
    /// # Errors
    /// `HostError::HostAlreadyInState` if already stopped, driver and timeout errors otherwise
    #[instrument(skip(self), fields(machine = %self.name))]
    pub async fn kill(&self) -> Result<(), CoreError> {
        info!(fields = %self.fields(), "killing");
        self.run_action_for_state(|| self.driver.kill(), State::Stopped)
            .await?;
        info!(fields = %self.fields(), "machine was killed");
        Ok(())
    }

    /// Bring the host back to `Running`
    ///
    /// A stopped host is started, a running host is restarted through the
    /// driver. Hosts in any other state are left alone.
    ///
    /// # Errors
    /// Driver and timeout errors
    #[instrument(skip(self), fields(machine = %self.name))]
    pub async fn restart(&self) -> Result<(), CoreError> {
        info!(fields = %self.fields(), "restarting");
        if machine_in_state(self.driver, State::Stopped).await {
            return self.start().await;
        }
        if machine_in_state(self.driver, State::Running).await {
            self.driver.restart().await?;
            wait_for(&self.policy, || machine_in_state(self.driver, State::Running)).await?;
        }
        Ok(())
    }
}
