//! Fetch command - download the tiles of a viewport into the cache.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use cavemap::cache::TileDiskCache;
use cavemap::fetch::{FetchSummary, TileFetcher};
use cavemap::grid::plan_tiles;
use cavemap::provider::{HttpClient, ReqwestClient};

use super::common::{load_config, GridArgs};
use crate::error::CliError;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub grid: GridArgs,
    pub api_key: Option<String>,
    pub workers: Option<usize>,
    pub no_cache: bool,
    pub timeout: u64,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let mut config = load_config();
    if let Some(key) = args.api_key {
        config.provider.api_key = key;
    }
    if let Some(workers) = args.workers {
        config.fetch.workers = workers;
    }

    let request = args.grid.to_request(&config)?;
    let provider = config.to_provider()?;
    let cache = (!args.no_cache).then(|| TileDiskCache::new(&config.cache.directory));

    // Held here so the blocking client is dropped outside the runtime.
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::with_timeout(args.timeout)?);
    let fetcher = TileFetcher::new(provider, http.clone(), cache, config.to_fetch_config())?;

    let plan = plan_tiles(&request, fetcher.provider_name());
    let total = plan.len() as u64;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to start runtime: {}", e)))?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    ctrlc::set_handler(move || cancel_clone.cancel())
        .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} tiles {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let mut failures = Vec::new();
    let summary = runtime.block_on(async {
        let mut rx = fetcher.dispatch(plan, cancel.clone());
        let mut summary = FetchSummary::default();
        while let Some(outcome) = rx.recv().await {
            summary.record(&outcome);
            if let Err(e) = &outcome.result {
                failures.push((outcome.placement.cache_key.clone(), e.to_string()));
            }
            progress.set_message(summary.to_string());
            progress.inc(1);
        }
        summary
    });
    progress.finish_and_clear();
    drop(runtime);
    drop(fetcher);
    drop(http);

    for (key, error) in failures.iter().take(10) {
        println!("{} {}: {}", style("Failed").red(), key, error);
    }
    if failures.len() > 10 {
        println!("... and {} more", failures.len() - 10);
    }

    if cancel.is_cancelled() {
        println!("{} fetch cancelled", style("Warning:").yellow());
    }
    println!("Tiles: {} ({} total)", summary, total);
    Ok(())
}
