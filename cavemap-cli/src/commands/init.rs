//! Init command - write a configuration file with defaults.

use cavemap::config::{config_file_path, ConfigFile};

use super::common::load_config;
use crate::error::CliError;

/// Run the init command.
pub fn run(api_key: Option<String>) -> Result<(), CliError> {
    let path = config_file_path();
    let mut config = if path.exists() {
        load_config()
    } else {
        ConfigFile::default()
    };

    if let Some(key) = api_key {
        config.provider.api_key = key;
    }
    config.save()?;

    println!("Configuration file: {}", path.display());
    println!("  Tile cache: {}", config.cache.directory.display());
    println!("  Logs:       {}", config.logging.directory.display());
    if config.provider.api_key.is_empty() {
        println!();
        println!("No API key set. Add api_key under [provider] to fetch map tiles.");
    }
    Ok(())
}
