//! Survey data model
//!
//! A [`Survey`] is one logging session on the device. It owns an ordered list
//! of [`Section`]s (survey lines), each owning an ordered list of
//! [`Point`]s (stations).
//!
//! Within a section, each point's incoming azimuth and length repeat the
//! previous point's outgoing values; see [`Section::is_chained`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque key/value properties decoded from a section's mode code.
pub type DeviceProperties = BTreeMap<String, String>;

/// One logging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub device_name: String,
    pub survey_datetime: DateTime<Utc>,
    pub survey_name: String,
    pub comment: String,
    /// Sections in device order.
    pub sections: Vec<Section>,
}

impl Survey {
    /// Creates an empty survey.
    pub fn new(device_name: impl Into<String>, survey_datetime: DateTime<Utc>) -> Self {
        Self {
            device_name: device_name.into(),
            survey_datetime,
            survey_name: String::new(),
            comment: String::new(),
            sections: Vec::new(),
        }
    }

    /// Total number of points across all sections.
    pub fn point_count(&self) -> usize {
        self.sections.iter().map(|s| s.points.len()).sum()
    }

    /// Looks up a section by its device reference id.
    pub fn section(&self, section_reference_id: u16) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.section_reference_id == section_reference_id)
    }
}

/// A contiguous run of points sharing a device-assigned reference id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Device-local id, unique only within one survey.
    pub section_reference_id: u16,
    pub device_properties: DeviceProperties,
    pub name: String,
    pub comment: String,
    pub points: Vec<Point>,
}

impl Section {
    /// Creates an empty section.
    pub fn new(section_reference_id: u16, device_properties: DeviceProperties) -> Self {
        Self {
            section_reference_id,
            device_properties,
            name: String::new(),
            comment: String::new(),
            points: Vec::new(),
        }
    }

    /// Last point appended, if any.
    pub fn last_point(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Checks that every point's incoming values repeat its predecessor's
    /// outgoing values.
    pub fn is_chained(&self) -> bool {
        self.points.windows(2).all(|pair| {
            pair[1].azimuth_in == pair[0].azimuth_out && pair[1].length_in == pair[0].length_out
        })
    }

    /// Sum of all outgoing leg lengths in meters.
    pub fn total_length(&self) -> f64 {
        self.points.iter().map(|p| p.length_out).sum()
    }
}

/// One shot measured at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// 1-based sequence number within the section.
    pub point_reference_id: u32,
    /// Back-link to the owning section's reference id.
    pub section_reference_id: u16,
    /// Depth in device units.
    pub depth: f64,
    pub temperature: f64,
    /// Degrees, 0-360.
    pub azimuth_in: f64,
    /// Degrees, 0-360.
    pub azimuth_out: f64,
    /// Meters.
    pub length_in: f64,
    /// Meters.
    pub length_out: f64,
    pub name: String,
    pub comment: String,
}
