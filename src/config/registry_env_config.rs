//! Instrument registry configuration parsing from environment variables.
//!
//! This module resolves where the instrument table lives, how it is encoded
//! and the stop-loss distance used for symbols the table does not list.

use crate::infrastructure::registry_loader::{RegistryLoader, SourceFormat};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_REGISTRY_PATH: &str = "conf/saxo_tickers.js";
pub const DEFAULT_STOPLOSS_POINTS: i64 = 9;

/// Registry environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEnvConfig {
    pub path: PathBuf,
    /// Explicit source format; `None` detects it from the file extension
    pub format: Option<SourceFormat>,
    pub default_stoploss_points: Decimal,
}

impl Default for RegistryEnvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            format: None,
            default_stoploss_points: Decimal::from(DEFAULT_STOPLOSS_POINTS),
        }
    }
}

impl RegistryEnvConfig {
    pub fn from_env() -> Result<Self> {
        let path = env::var("INSTRUMENT_REGISTRY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REGISTRY_PATH));

        let format = match env::var("INSTRUMENT_REGISTRY_FORMAT") {
            Ok(value) => Some(
                SourceFormat::from_str(&value).context("Failed to parse INSTRUMENT_REGISTRY_FORMAT")?,
            ),
            Err(_) => None,
        };

        let default_stoploss_points = Self::parse_decimal(
            "DEFAULT_STOPLOSS_POINTS",
            Decimal::from(DEFAULT_STOPLOSS_POINTS),
        )?;
        if default_stoploss_points <= Decimal::ZERO {
            anyhow::bail!(
                "DEFAULT_STOPLOSS_POINTS must be positive, got {}",
                default_stoploss_points
            );
        }

        Ok(Self {
            path,
            format,
            default_stoploss_points,
        })
    }

    /// Loader for the configured table
    pub fn loader(&self) -> RegistryLoader {
        let loader = RegistryLoader::new(&self.path);
        match self.format {
            Some(format) => loader.with_format(format),
            None => loader,
        }
    }

    fn parse_decimal(key: &str, default: Decimal) -> Result<Decimal> {
        match env::var(key) {
            Ok(value) => Decimal::from_str(value.trim()).context(format!("Failed to parse {}", key)),
            Err(_) => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_defaults() {
        let config = RegistryEnvConfig::default();
        assert_eq!(config.path, PathBuf::from("conf/saxo_tickers.js"));
        assert_eq!(config.default_stoploss_points, Decimal::from(9));
        assert_eq!(config.loader().format(), SourceFormat::Json);
    }

    #[test]
    fn test_format_override_wins_over_extension() {
        let config = RegistryEnvConfig {
            path: PathBuf::from("tickers.cfg"),
            format: Some(SourceFormat::Toml),
            ..Default::default()
        };
        let loader = config.loader();
        assert_eq!(loader.format(), SourceFormat::Toml);
        assert_eq!(loader.path(), PathBuf::from("tickers.cfg").as_path());
    }
}
