//! Import command - read a dump from a connected Mnemo.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use console::style;
use tracing::info;

use cavemap::mnemo::{import_from_device, write_dump_file, DecodeOptions, DumpDecoder};
use cavemap::project::save_project;

use super::common::{load_config, print_survey};
use crate::error::CliError;

/// Arguments for the import command.
pub struct ImportArgs {
    /// Explicit serial port; skips discovery.
    pub port: Option<PathBuf>,
    /// Where to keep the raw dump.
    pub output: Option<PathBuf>,
    pub name: Option<String>,
    pub project: Option<PathBuf>,
}

/// Run the import command.
pub fn run(args: ImportArgs) -> Result<(), CliError> {
    let config = load_config();
    let device_config = config.to_device_config();

    match &args.port {
        Some(port) => println!("Reading from {}", port.display()),
        None => println!("Looking for a Mnemo device..."),
    }
    println!("Start the transfer on the device. Press Ctrl+C to stop.");

    let abort = Arc::new(AtomicBool::new(false));
    let abort_clone = abort.clone();
    ctrlc::set_handler(move || {
        abort_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let (port, bytes) = import_from_device(&device_config, args.port.as_deref(), &abort)?;
    println!("Read {} bytes from {}", bytes.len(), port.display());
    let imported_at = Utc::now();

    if abort.load(Ordering::SeqCst) {
        println!("{} transfer interrupted, keeping partial data", style("Warning:").yellow());
    }

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!("mnemo-{}.dmp", imported_at.format("%Y%m%d-%H%M%S")))
    });
    write_dump_file(&output, &bytes)?;
    info!(path = %output.display(), bytes = bytes.len(), "Saved raw dump");
    println!("Saved {} bytes to {}", bytes.len(), output.display());
    println!();

    let mut options = DecodeOptions::new(imported_at);
    if let Some(name) = args.name {
        options = options.with_survey_name(name);
    }
    let decoded = DumpDecoder::new(options).decode(&bytes);
    print_survey(&decoded.survey);
    for warning in &decoded.warnings {
        println!("{} {}", style("Skipped:").yellow(), warning);
    }

    if let Some(project) = args.project {
        save_project(&project, std::slice::from_ref(&decoded.survey))?;
        println!();
        println!("Saved project: {}", project.display());
    }
    Ok(())
}
