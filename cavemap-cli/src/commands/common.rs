//! Common types and utilities shared across CLI commands.

use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;

use cavemap::config::ConfigFile;
use cavemap::coord::{LatLng, MAX_LAT, MIN_LAT};
use cavemap::grid::{GridRequest, PixelSize};
use cavemap::mnemo::{read_dump_file, DecodeOptions, DecodedDump, DumpDecoder};
use cavemap::survey::Survey;

use crate::error::CliError;

/// Viewport arguments shared by `grid` and `fetch`.
#[derive(Debug, Clone, Args)]
pub struct GridArgs {
    /// Latitude of the viewport center
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the viewport center
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Zoom level (fractional values are floored)
    #[arg(long, default_value_t = 16.0)]
    pub zoom: f64,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Tile width in pixels (defaults to config)
    #[arg(long)]
    pub tile_width: Option<u32>,

    /// Tile height in pixels (defaults to config)
    #[arg(long)]
    pub tile_height: Option<u32>,
}

impl GridArgs {
    /// Builds a grid request, filling tile size from config.
    pub fn to_request(&self, config: &ConfigFile) -> Result<GridRequest, CliError> {
        // Mercator is undefined at the poles.
        if !(MIN_LAT..=MAX_LAT).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(CliError::Config(format!(
                "center {},{} is outside the mappable range (latitude {}..={})",
                self.lat, self.lng, MIN_LAT, MAX_LAT
            )));
        }
        if self.zoom < 0.0 {
            return Err(CliError::Config("zoom must not be negative".to_string()));
        }

        let defaults = config.tile_size();
        let tile_size = PixelSize::new(
            self.tile_width.unwrap_or(defaults.width),
            self.tile_height.unwrap_or(defaults.height),
        );
        if tile_size.width == 0 || tile_size.height == 0 {
            return Err(CliError::Config("tile size must be non-zero".to_string()));
        }

        Ok(GridRequest::new(
            LatLng::new(self.lat, self.lng),
            PixelSize::new(self.width, self.height),
            tile_size,
            self.zoom,
        ))
    }
}

/// Load config or return default, reporting parse problems.
pub fn load_config() -> ConfigFile {
    match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            eprintln!("Using default settings.");
            ConfigFile::default()
        }
    }
}

/// Parses an RFC 3339 timestamp, defaulting to now.
pub fn parse_survey_date(date: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    match date {
        None => Ok(Utc::now()),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| CliError::Config(format!("invalid date '{}': {}", text, e))),
    }
}

/// Reads and decodes a dump file.
pub fn decode_dump_file(path: &Path, options: DecodeOptions) -> Result<DecodedDump, CliError> {
    let bytes = read_dump_file(path)?;
    Ok(DumpDecoder::new(options).decode(&bytes))
}

/// Prints a survey summary with one line per section.
pub fn print_survey(survey: &Survey) {
    let title = if survey.survey_name.is_empty() {
        "(unnamed survey)"
    } else {
        survey.survey_name.as_str()
    };
    println!("{}", style(title).bold());
    println!("  Device:   {}", survey.device_name);
    println!("  Date:     {}", survey.survey_datetime.to_rfc3339());
    println!("  Sections: {}", survey.sections.len());
    println!("  Points:   {}", survey.point_count());

    for section in &survey.sections {
        let mode = section
            .device_properties
            .get(cavemap::mnemo::MODE_PROPERTY)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "    #{:<4} {:<4} {:>4} points  {:>8.2} m",
            section.section_reference_id,
            mode,
            section.points.len(),
            section.total_length()
        );
    }
}
