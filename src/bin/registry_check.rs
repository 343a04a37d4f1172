//! Registry Check - validates the configured instrument table
//!
//! Loads the table named by the environment, logs every instrument and
//! exits with an error if the table is malformed or violates an invariant.
//!
//! # Usage
//! ```sh
//! INSTRUMENT_REGISTRY_PATH=conf/saxo_tickers.js cargo run --bin registry_check
//! ```
//!
//! # Environment Variables
//! - `INSTRUMENT_REGISTRY_PATH` - Table to load (default: conf/saxo_tickers.js)
//! - `INSTRUMENT_REGISTRY_FORMAT` - `json` or `toml` (default: by extension)
//! - `DEFAULT_STOPLOSS_POINTS` - Fallback stop loss for unlisted symbols (default: 9)

use anyhow::Result;
use instrument_registry::config::load_registry_from_env;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Registry check {} starting...", env!("CARGO_PKG_VERSION"));

    let (registry, config) = load_registry_from_env()?;
    info!(
        "Registry loaded: {} instruments from {:?}, default stop loss {} points",
        registry.len(),
        config.path,
        config.default_stoploss_points
    );

    for record in &registry {
        info!(
            "{:<6} Uic={:<6} AssetType={:<10} SL={} 200MA={}",
            record.symbol,
            record.uic,
            record.asset_type,
            record.stop_loss_points,
            record.reference_moving_average
        );
        if !record.asset_type.is_known() {
            warn!(
                "{}: asset type '{}' is not one of the known CFD types",
                record.symbol, record.asset_type
            );
        }
    }

    if registry.is_empty() {
        warn!("Instrument table is empty.");
    }

    Ok(())
}
