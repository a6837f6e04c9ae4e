//! Tracing subscriber setup for the binary

use tracing_subscriber::EnvFilter;

use crate::core::config::LoggingConfig;
use crate::core::error::{BridgeError, Result};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| BridgeError::Other(format!("Failed to install logger: {}", e)))
}
