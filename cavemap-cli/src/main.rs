//! CaveMap CLI - Command-line interface
//!
//! Imports Mnemo survey dumps and plans/fetches the map tiles around a
//! surveyed area.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use tracing::debug;

use cavemap::logging::{init_logging, LoggingConfig, LoggingGuard};

use commands::cache::CacheAction;
use commands::common::{load_config, GridArgs};
use commands::decode::DecodeArgs;
use commands::fetch::FetchArgs;
use commands::import::ImportArgs;
use commands::project::ProjectAction;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "cavemap", version, about = "Cave survey import and map tile planning")]
struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not write log files
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update ~/.cavemap/config.ini
    Init {
        /// Map provider API key to store
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Decode a saved dump file
    Decode {
        /// Dump file (`;`-separated bytes)
        input: PathBuf,
        /// Survey name
        #[arg(long)]
        name: Option<String>,
        /// Survey date (RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
        /// Also save the survey as a project file
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Read a dump from a connected Mnemo
    Import {
        /// Serial port (skips auto-discovery)
        #[arg(long)]
        port: Option<PathBuf>,
        /// Where to save the raw dump
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Survey name
        #[arg(long)]
        name: Option<String>,
        /// Also save the survey as a project file
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Print the tile plan for a viewport
    Grid(GridArgs),
    /// Download the tiles of a viewport into the cache
    Fetch {
        #[command(flatten)]
        grid: GridArgs,
        /// Provider API key (overrides config)
        #[arg(long)]
        api_key: Option<String>,
        /// Concurrent downloads (overrides config)
        #[arg(long)]
        workers: Option<usize>,
        /// Always download, never read or write the cache
        #[arg(long)]
        no_cache: bool,
        /// HTTP timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Project file operations
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Tile cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let _guard = setup_logging(&cli);
    debug!(version = cavemap::VERSION, "Starting");

    if let Err(e) = run(cli.command) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(e.exit_code());
    }
}

fn setup_logging(cli: &Cli) -> Option<LoggingGuard> {
    let config = load_config();
    let mut logging = if cli.no_log_file {
        LoggingConfig::default()
    } else {
        config.to_logging_config()
    };
    logging.level = match cli.verbose {
        0 => logging.level,
        1 => "cavemap=debug,info".to_string(),
        _ => "cavemap=trace,debug".to_string(),
    };

    match init_logging(&logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            None
        }
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Init { api_key } => commands::init::run(api_key),
        Commands::Decode {
            input,
            name,
            date,
            project,
        } => commands::decode::run(DecodeArgs {
            input,
            name,
            date,
            project,
        }),
        Commands::Import {
            port,
            output,
            name,
            project,
        } => commands::import::run(ImportArgs {
            port,
            output,
            name,
            project,
        }),
        Commands::Grid(args) => commands::grid::run(args),
        Commands::Fetch {
            grid,
            api_key,
            workers,
            no_cache,
            timeout,
        } => commands::fetch::run(FetchArgs {
            grid,
            api_key,
            workers,
            no_cache,
            timeout,
        }),
        Commands::Project { action } => commands::project::run(action),
        Commands::Cache { action } => commands::cache::run(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grid_with_negative_longitude() {
        let cli = Cli::parse_from(["cavemap", "grid", "--lat", "43.6", "--lng", "-1.5"]);
        match cli.command {
            Commands::Grid(args) => {
                assert_eq!(args.lng, -1.5);
                assert_eq!(args.zoom, 16.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_project_save() {
        let cli = Cli::parse_from([
            "cavemap", "project", "save", "-o", "cave.cavemap", "a.dmp", "b.dmp",
        ]);
        match cli.command {
            Commands::Project {
                action: ProjectAction::Save { output, dumps, .. },
            } => {
                assert_eq!(output, PathBuf::from("cave.cavemap"));
                assert_eq!(dumps.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
