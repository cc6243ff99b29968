//! Decode command - decode a saved dump file and print the survey.

use std::path::PathBuf;

use console::style;

use cavemap::mnemo::DecodeOptions;
use cavemap::project::save_project;

use super::common::{decode_dump_file, parse_survey_date, print_survey};
use crate::error::CliError;

/// Arguments for the decode command.
pub struct DecodeArgs {
    pub input: PathBuf,
    pub name: Option<String>,
    pub date: Option<String>,
    pub project: Option<PathBuf>,
}

/// Run the decode command.
pub fn run(args: DecodeArgs) -> Result<(), CliError> {
    let mut options = DecodeOptions::new(parse_survey_date(args.date.as_deref())?);
    if let Some(name) = args.name {
        options = options.with_survey_name(name);
    }

    let decoded = decode_dump_file(&args.input, options)?;
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
