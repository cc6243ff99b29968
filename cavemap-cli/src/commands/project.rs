//! Project commands - bundle dumps into a project file and inspect it.

use std::path::PathBuf;

use clap::Subcommand;
use console::style;

use cavemap::mnemo::DecodeOptions;
use cavemap::project::{read_project_file, save_project};

use super::common::{decode_dump_file, parse_survey_date, print_survey};
use crate::error::CliError;

/// Project action subcommands.
#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    /// Decode dump files and save them as one project
    Save {
        /// Project file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Survey date for every dump (RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Dump files, one survey each
        #[arg(required = true)]
        dumps: Vec<PathBuf>,
    },
    /// Show what a project file contains
    Info {
        /// Project file to read
        path: PathBuf,
    },
}

/// Run a project subcommand.
pub fn run(action: ProjectAction) -> Result<(), CliError> {
    match action {
        ProjectAction::Save {
            output,
            date,
            dumps,
        } => {
            let survey_datetime = parse_survey_date(date.as_deref())?;
            let mut surveys = Vec::with_capacity(dumps.len());

            for dump in &dumps {
                let name = dump
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let options = DecodeOptions::new(survey_datetime).with_survey_name(name);
                let decoded = decode_dump_file(dump, options)?;
                if !decoded.warnings.is_empty() {
                    println!(
                        "{} {}: {} malformed record(s) skipped",
                        style("Warning:").yellow(),
                        dump.display(),
                        decoded.warnings.len()
                    );
                }
                surveys.push(decoded.survey);
            }

            save_project(&output, &surveys)?;
            println!("Saved {} survey(s) to {}", surveys.len(), output.display());
            Ok(())
        }
        ProjectAction::Info { path } => {
            let document = read_project_file(&path)?;
            println!("Project:  {}", path.display());
            println!("  Format: {}", document.format_version);
            println!("  Saved:  {}", document.saved_at.to_rfc3339());
            println!(
                "  Rows:   {} surveys, {} sections, {} points",
                document.tables.surveys.len(),
                document.tables.sections.len(),
                document.tables.points.len()
            );
            println!();

            for survey in document.into_surveys()? {
                print_survey(&survey);
                println!();
            }
            Ok(())
        }
    }
}
