//! Library side of the `facetdb` maintenance binary.

pub mod args;
pub mod commands;
pub mod logging;

use anyhow::Context;
use facetdb_configs::FacetConfig;

pub use args::{Cli, Command};

/// Loads the configuration named on the command line (or defaults) and
/// applies the command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<FacetConfig> {
    let mut config = match &cli.config {
        Some(path) => FacetConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            let mut config = FacetConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(data_path) = &cli.data_path {
        config.storage.data_path = data_path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}
