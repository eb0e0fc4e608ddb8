//! Driver port
//!
//! A driver controls one machine on some backend. Concrete drivers live
//! outside this crate.

use async_trait::async_trait;

use crate::error::DriverError;
use crate::state::State;

#[async_trait]
pub trait Driver: Send + Sync {
    /// Backend name, e.g. `kvm2`
    fn driver_name(&self) -> &str;

    /// Name of the machine this driver controls
    fn machine_name(&self) -> &str;

    /// Driver-owned configuration persisted with the host
    fn config(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Observe the machine's current state
    async fn state(&self) -> Result<State, DriverError>;

    /// Check the environment before creating anything
    async fn pre_create_check(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn create(&self) -> Result<(), DriverError>;

    async fn start(&self) -> Result<(), DriverError>;

    async fn stop(&self) -> Result<(), DriverError>;

    /// Stop without a graceful shutdown
    async fn kill(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported {
            driver: self.driver_name().to_string(),
            operation: "kill",
        })
    }

    async fn restart(&self) -> Result<(), DriverError> {
        self.stop().await?;
        self.start().await
    }
}
