//! Configuration module for the instrument registry.
//!
//! Settings come from environment variables (a `.env` file is honoured by
//! the binaries through `dotenvy`).

mod registry_env_config;

pub use registry_env_config::{DEFAULT_REGISTRY_PATH, DEFAULT_STOPLOSS_POINTS, RegistryEnvConfig};

use crate::domain::registry::InstrumentRegistry;
use anyhow::{Context, Result};

/// Load the instrument registry described by the environment.
///
/// Returns the registry together with the configuration it was loaded from,
/// so callers keep the fallback stop-loss distance next to the table.
pub fn load_registry_from_env() -> Result<(InstrumentRegistry, RegistryEnvConfig)> {
    let config = RegistryEnvConfig::from_env().context("Failed to load registry config")?;
    let registry = config
        .loader()
        .load()
        .with_context(|| format!("Failed to load instrument registry from {:?}", config.path))?;
    Ok((registry, config))
}
