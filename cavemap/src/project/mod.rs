//! Project persistence.
//!
//! A project file is UTF-8 JSON compressed with zlib. The JSON holds a
//! `format_version` (semver) and the survey data as relational tables (see
//! [`ProjectTables`]). Files written by a newer format version are refused
//! before any data is loaded.

mod error;
mod tables;

pub use error::{ProjectError, ProjectResult};
pub use tables::{PointRow, ProjectTables, SectionRow, SurveyRow};

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::survey::Survey;

/// Format version written by this release.
pub const PROJECT_FORMAT_VERSION: &str = "1.0.0";

/// Conventional file extension.
pub const PROJECT_EXTENSION: &str = "cavemap";

/// Top-level document of a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub format_version: String,
    pub saved_at: DateTime<Utc>,
    pub tables: ProjectTables,
}

/// Only the version, read before committing to the full schema.
#[derive(Deserialize)]
struct VersionProbe {
    format_version: String,
}

impl ProjectFile {
    /// Builds a document for the current format version.
    pub fn from_surveys(surveys: &[Survey]) -> Self {
        Self {
            format_version: PROJECT_FORMAT_VERSION.to_string(),
            saved_at: Utc::now(),
            tables: ProjectTables::from_surveys(surveys),
        }
    }

    /// Rebuilds the survey trees.
    pub fn into_surveys(self) -> ProjectResult<Vec<Survey>> {
        self.tables.into_surveys()
    }
}

/// Refuses versions newer than [`PROJECT_FORMAT_VERSION`].
pub fn check_format_version(found: &str) -> ProjectResult<()> {
    let parse = |v: &str| {
        Version::parse(v).map_err(|e| ProjectError::InvalidVersion {
            version: v.to_string(),
            reason: e.to_string(),
        })
    };
    let found_version = parse(found)?;
    let supported = parse(PROJECT_FORMAT_VERSION)?;

    if found_version > supported {
        return Err(ProjectError::VersionMismatch {
            found: found.to_string(),
            supported: PROJECT_FORMAT_VERSION.to_string(),
        });
    }
    Ok(())
}

/// Writes surveys to a project file, replacing it atomically.
pub fn save_project(path: &Path, surveys: &[Survey]) -> ProjectResult<()> {
    let document = ProjectFile::from_surveys(surveys);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ProjectError::io(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path).map_err(|e| ProjectError::io(&temp_path, e))?;
    let mut encoder = ZlibEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, &document)?;

    let mut writer = encoder
        .finish()
        .map_err(|e| ProjectError::io(&temp_path, e))?;
    writer.flush().map_err(|e| ProjectError::io(&temp_path, e))?;
    drop(writer);

    fs::rename(&temp_path, path).map_err(|e| ProjectError::io(path, e))?;

    info!(
        path = %path.display(),
        surveys = document.tables.surveys.len(),
        points = document.tables.points.len(),
        "Saved project"
    );
    Ok(())
}

/// Reads and version-checks a project file without rebuilding the trees.
pub fn read_project_file(path: &Path) -> ProjectResult<ProjectFile> {
    let file = File::open(path).map_err(|e| ProjectError::io(path, e))?;
    let mut json = Vec::new();
    ZlibDecoder::new(file)
        .read_to_end(&mut json)
        .map_err(|e| ProjectError::io(path, e))?;

    let probe: VersionProbe = serde_json::from_slice(&json)?;
    check_format_version(&probe.format_version)?;

    let document: ProjectFile = serde_json::from_slice(&json)?;
    debug!(
        path = %path.display(),
        version = %document.format_version,
        "Read project file"
    );
    Ok(document)
}

/// Loads surveys from a project file.
///
/// # Errors
///
/// `VersionMismatch` if the file is from a newer format; nothing is loaded.
pub fn load_project(path: &Path) -> ProjectResult<Vec<Survey>> {
    let surveys = read_project_file(path)?.into_surveys()?;
    info!(path = %path.display(), surveys = surveys.len(), "Loaded project");
    Ok(surveys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{DeviceProperties, Point, Section};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_surveys() -> Vec<Survey> {
        let mut survey = Survey::new("Mnemo", Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap());
        survey.survey_name = "Grotte de la Cigalère".to_string();

        for section_id in [1u16, 2] {
            let mut properties = DeviceProperties::new();
            properties.insert("mode".to_string(), "STD".to_string());
            let mut section = Section::new(section_id, properties);
            for n in 1..=3u32 {
                section.points.push(Point {
                    point_reference_id: n,
                    section_reference_id: section_id,
                    depth: n as f64 * 2.0,
                    temperature: 12.0,
                    azimuth_in: 0.0,
                    azimuth_out: 90.5,
                    length_in: 0.0,
                    length_out: 3.25,
                    name: format!("S{}-{}", section_id, n),
                    comment: String::new(),
                });
            }
            survey.sections.push(section);
        }

        let second = Survey::new("Mnemo", Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
        vec![survey, second]
    }

    fn write_raw(path: &Path, json: &str) {
        let file = File::create(path).unwrap();
        let mut encoder = ZlibEncoder::new(file, Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_save_and_load_preserves_trees() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cave.cavemap");
        let surveys = sample_surveys();

        save_project(&path, &surveys).unwrap();
        let loaded = load_project(&path).unwrap();

        assert_eq!(loaded, surveys);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_is_compressed_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cave.cavemap");
        save_project(&path, &sample_surveys()).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_ne!(raw.first(), Some(&b'{'));

        let document = read_project_file(&path).unwrap();
        assert_eq!(document.format_version, PROJECT_FORMAT_VERSION);
        assert_eq!(document.tables.surveys.len(), 2);
        assert_eq!(document.tables.sections.len(), 2);
        assert_eq!(document.tables.points.len(), 6);
        assert_eq!(document.tables.points[3].section_id, 2);
    }

    #[test]
    fn test_newer_version_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("future.cavemap");
        write_raw(&path, r#"{"format_version":"2.1.0","something_new":true}"#);

        match load_project(&path) {
            Err(ProjectError::VersionMismatch { found, supported }) => {
                assert_eq!(found, "2.1.0");
                assert_eq!(supported, PROJECT_FORMAT_VERSION);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_version_checks() {
        assert!(check_format_version("1.0.0").is_ok());
        assert!(check_format_version("0.9.3").is_ok());
        assert!(matches!(
            check_format_version("1.0.1"),
            Err(ProjectError::VersionMismatch { .. })
        ));
        assert!(matches!(
            check_format_version("one"),
            Err(ProjectError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_dangling_section_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.cavemap");
        write_raw(
            &path,
            r#"{"format_version":"1.0.0","saved_at":"2024-03-09T14:30:00Z",
               "tables":{"surveys":[],"sections":[{"id":1,"survey_id":7,
               "section_reference_id":1,"device_properties":{},"name":"","comment":""}],
               "points":[]}}"#,
        );

        assert!(matches!(load_project(&path), Err(ProjectError::Corrupt(_))));
    }

    #[test]
    fn test_uncompressed_file_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.cavemap");
        fs::write(&path, br#"{"format_version":"1.0.0"}"#).unwrap();

        assert!(load_project(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            load_project(&temp.path().join("nope.cavemap")),
            Err(ProjectError::Io { .. })
        ));
    }
}
