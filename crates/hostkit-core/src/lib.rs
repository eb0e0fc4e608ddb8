//! hostkit-core: Host lifecycle vocabulary and ports
//!
//! State and action vocabularies, the host error taxonomy, the host store
//! and provider ports, and the driver-backed lifecycle helpers built on them.

pub mod action;
pub mod config;
pub mod driver;
pub mod error;
pub mod fields;
pub mod host;
pub mod lifecycle;
pub mod provider;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod version;

pub use action::{PackageAction, ServiceAction};
pub use config::{ClientType, Config, LogConfig, SshConfig, WaitConfig};
pub use driver::Driver;
pub use error::{BoxError, ConfigError, CoreError, DriverError, HostError, Severity, StoreError};
pub use fields::{FieldValue, Fields};
pub use host::{Host, validate_host_name};
pub use lifecycle::{Lifecycle, WaitPolicy, machine_in_state, wait_for};
pub use provider::{DriverProvider, Provider, create_host};
pub use state::State;
pub use store::{FakeStore, HostStore, HostStoreExt, MemoryStore};
pub use version::{API_VERSION, CONFIG_VERSION};
