//! Tracing subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;
use crate::error::ConfigError;

/// Build the filter: `RUST_LOG` wins over the configured level
fn env_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| ConfigError::Logging(format!("bad level {:?}: {e}", config.level))),
    }
}

type BoxSubscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Registry with the filter and a plain or JSON fmt layer
fn build_subscriber(config: &LogConfig) -> Result<BoxSubscriber, ConfigError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    Ok(if config.json {
        Box::new(registry.with(fmt::layer().json()))
    } else {
        Box::new(registry.with(fmt::layer()))
    })
}

/// Install the global tracing subscriber
///
/// # Errors
/// Returns `ConfigError::Logging` if the level is not a valid filter or a
/// global subscriber is already installed
pub fn try_init(config: &LogConfig) -> Result<(), ConfigError> {
    build_subscriber(config)?
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_level() {
        // RUST_LOG overrides the configured level
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "hostkit=loud".to_string(),
            json: false,
        };
        assert!(matches!(env_filter(&config), Err(ConfigError::Logging(_))));
    }

    #[test]
    fn test_second_init_fails_cleanly() {
        let config = LogConfig::default();
        let _ = try_init(&config);
        assert!(try_init(&config).is_err());
    }

    #[test]
    fn test_json_subscriber_records_events() {
        let config = LogConfig {
            level: "debug".to_string(),
            json: true,
        };
        let subscriber = build_subscriber(&config).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(machine = "dev", state = "Running", "json event");
        });
    }
}
