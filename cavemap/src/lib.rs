//! CaveMap - cave survey import and map tile grids
//!
//! This library decodes survey dumps from a Mnemo cave-surveying device and
//! lays out the map tiles needed to draw a viewport around a surveyed area.
//!
//! - [`mnemo`] reads dumps from the device or a file into a [`survey::Survey`]
//! - [`coord`] converts between latitude/longitude and Web Mercator tile space
//! - [`grid`] enumerates tiles for a viewport in a spiral from the center
//! - [`fetch`] downloads those tiles with bounded concurrency into a [`cache`]
//! - [`project`] saves and loads surveys as compressed project files

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod grid;
pub mod logging;
pub mod mnemo;
pub mod project;
pub mod provider;
pub mod survey;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_semver() {
        assert!(semver::Version::parse(VERSION).is_ok());
    }
}
