//! Cache management CLI commands.

use clap::Subcommand;

use cavemap::cache::TileDiskCache;

use super::common::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the tile cache, removing all cached tiles
    Clear,
    /// Show tile cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = load_config();
    let cache = TileDiskCache::new(&config.cache.directory);

    match action {
        CacheAction::Clear => {
            println!("Clearing tile cache at: {}", cache.root().display());
            let result = cache.clear()?;
            println!("{}", capitalize(&result.to_string()));
        }
        CacheAction::Stats => {
            let stats = cache.stats()?;
            println!("Tile cache: {}", cache.root().display());
            println!("  Files: {}", stats.files);
            println!("  Size:  {}", cavemap::cache::format_size(stats.total_bytes));
        }
    }
    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
