//! Mnemo dump decoder.
//!
//! # Layout
//!
//! ```text
//! ┌──────────┬──────────────────────────────┬──────────────────────────────┬───
//! │ header 6 │ mode 3 │ id 2 │ point 16 │ … │ mode 3 │ id 2 │ point 16 │ … │
//! └──────────┴──────────────────────────────┴──────────────────────────────┴───
//!
//! point record (offsets in bytes, words big-endian):
//!   0-1   section reference id
//!   2-3   azimuth in (device copy, superseded by chaining)
//!   4-5   azimuth out  / 10  -> degrees
//!   6-7   length out   / 100 -> meters
//!   8-9   depth
//!   10-11 temperature
//!   12-15 reserved
//! ```
//!
//! A section ends when the next record carries a different section id (that
//! record is then the next section's header) or when the input runs out.
//! A trailing fragment that holds neither a full record nor a section header
//! with a full record (or a bare header at the very end) is dropped with a
//! warning.
//!
//! The boundary test reads the first two mode bytes of the next header as a
//! word. A section whose id equals that word (e.g. `0x5354` before an `STD`
//! header) swallows the header as a point. The device format leaves no other
//! marker to tell them apart.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::bytes::read_u16_be;
use crate::survey::{DeviceProperties, Point, Section, Survey};

/// Bytes skipped at the start of every dump.
pub const HEADER_LEN: usize = 6;

/// Length of the ASCII mode code opening a section.
pub const MODE_LEN: usize = 3;

/// Mode code plus the 2-byte section id.
pub const SECTION_HEADER_LEN: usize = MODE_LEN + 2;

/// Fixed width of one point record.
pub const POINT_RECORD_LEN: usize = 16;

/// Device name recorded when none is configured.
pub const DEFAULT_DEVICE_NAME: &str = "Mnemo";

/// Property key holding the raw mode code.
pub const MODE_PROPERTY: &str = "mode";

/// Recoverable problems found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// Trailing bytes too short for a full record were discarded.
    MalformedDumpRecord { offset: usize, remaining: usize },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::MalformedDumpRecord { offset, remaining } => write!(
                f,
                "discarded {} trailing byte(s) at offset {}",
                remaining, offset
            ),
        }
    }
}

/// Caller-supplied values the byte stream does not carry.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub device_name: String,
    pub survey_datetime: DateTime<Utc>,
    pub survey_name: String,
    /// Incoming azimuth of each section's first point.
    pub initial_azimuth_in: f64,
    /// Incoming length of each section's first point.
    pub initial_length_in: f64,
}

impl DecodeOptions {
    /// Creates options with the default device name and zero initial values.
    pub fn new(survey_datetime: DateTime<Utc>) -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            survey_datetime,
            survey_name: String::new(),
            initial_azimuth_in: 0.0,
            initial_length_in: 0.0,
        }
    }

    /// Sets the device name.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Sets the survey name.
    pub fn with_survey_name(mut self, name: impl Into<String>) -> Self {
        self.survey_name = name.into();
        self
    }

    /// Sets the incoming azimuth/length used for each section's first point.
    pub fn with_initial_leg(mut self, azimuth_in: f64, length_in: f64) -> Self {
        self.initial_azimuth_in = azimuth_in;
        self.initial_length_in = length_in;
        self
    }
}

/// Decoder output: the survey tree and anything that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDump {
    pub survey: Survey,
    pub warnings: Vec<DecodeWarning>,
}

/// Readings carried by one point record.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointRecord {
    section_reference_id: u16,
    azimuth_out: f64,
    length_out: f64,
    depth: f64,
    temperature: f64,
}

impl PointRecord {
    fn parse(record: &[u8]) -> Self {
        let word = |at: usize| read_u16_be(record[at], record[at + 1]);
        Self {
            section_reference_id: word(0),
            azimuth_out: word(4) as f64 / 10.0,
            length_out: word(6) as f64 / 100.0,
            depth: word(8) as f64,
            temperature: word(10) as f64,
        }
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn peek_word(&self) -> u16 {
        read_u16_be(self.data[self.pos], self.data[self.pos + 1])
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        slice
    }

    fn drain(&mut self) -> DecodeWarning {
        let warning = DecodeWarning::MalformedDumpRecord {
            offset: self.pos,
            remaining: self.remaining(),
        };
        self.pos = self.data.len();
        warning
    }
}

/// Decodes Mnemo dumps into [`Survey`] trees.
#[derive(Debug, Clone)]
pub struct DumpDecoder {
    options: DecodeOptions,
}

impl DumpDecoder {
    /// Creates a decoder.
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Decodes a complete dump.
    ///
    /// Never fails: truncated trailing data is reported in
    /// [`DecodedDump::warnings`] and otherwise ignored.
    pub fn decode(&self, data: &[u8]) -> DecodedDump {
        let mut survey = Survey::new(
            self.options.device_name.clone(),
            self.options.survey_datetime,
        );
        survey.survey_name = self.options.survey_name.clone();
        let mut warnings = Vec::new();

        if data.len() < HEADER_LEN {
            if !data.is_empty() {
                warnings.push(DecodeWarning::MalformedDumpRecord {
                    offset: 0,
                    remaining: data.len(),
                });
            }
            return self.finish(survey, warnings);
        }

        let mut reader = ByteReader {
            data,
            pos: HEADER_LEN,
        };

        while reader.remaining() > 0 {
            if !can_open_section(reader.remaining()) {
                warnings.push(reader.drain());
                break;
            }

            let mode = reader.take(MODE_LEN);
            let id_bytes = reader.take(2);
            let section_id = read_u16_be(id_bytes[0], id_bytes[1]);
            let mut section = Section::new(section_id, mode_properties(mode));

            if let Some(warning) = self.decode_points(&mut reader, &mut section) {
                warnings.push(warning);
            }

            debug!(
                section = section_id,
                points = section.points.len(),
                "Decoded section"
            );
            survey.sections.push(section);
        }

        self.finish(survey, warnings)
    }

    fn decode_points(
        &self,
        reader: &mut ByteReader<'_>,
        section: &mut Section,
    ) -> Option<DecodeWarning> {
        loop {
            let remaining = reader.remaining();
            if remaining == 0 {
                return None;
            }

            let same_section =
                remaining >= 2 && reader.peek_word() == section.section_reference_id;

            if same_section && remaining >= POINT_RECORD_LEN {
                let record = PointRecord::parse(reader.take(POINT_RECORD_LEN));
                self.append_point(section, record);
                continue;
            }

            // A differing id opens the next section only if the rest can hold
            // one. Anything else is a cut-off record.
            if !same_section && can_open_section(remaining) {
                return None;
            }
            return Some(reader.drain());
        }
    }

    fn append_point(&self, section: &mut Section, record: PointRecord) {
        let (azimuth_in, length_in) = match section.last_point() {
            Some(previous) => (previous.azimuth_out, previous.length_out),
            None => (
                self.options.initial_azimuth_in,
                self.options.initial_length_in,
            ),
        };

        let point_reference_id = section.points.len() as u32 + 1;
        section.points.push(Point {
            point_reference_id,
            section_reference_id: record.section_reference_id,
            depth: record.depth,
            temperature: record.temperature,
            azimuth_in,
            azimuth_out: record.azimuth_out,
            length_in,
            length_out: record.length_out,
            name: String::new(),
            comment: String::new(),
        });
    }

    fn finish(&self, survey: Survey, warnings: Vec<DecodeWarning>) -> DecodedDump {
        for warning in &warnings {
            warn!(%warning, "Malformed dump record dropped");
        }
        info!(
            device = %survey.device_name,
            sections = survey.sections.len(),
            points = survey.point_count(),
            "Decoded Mnemo dump"
        );
        DecodedDump { survey, warnings }
    }
}

/// A section is either a bare header at the very end or a header followed
/// by at least one full record.
fn can_open_section(remaining: usize) -> bool {
    remaining == SECTION_HEADER_LEN || remaining >= SECTION_HEADER_LEN + POINT_RECORD_LEN
}

fn mode_properties(mode: &[u8]) -> DeviceProperties {
    let code: String = mode.iter().map(|&b| b as char).collect();
    let mut properties = DeviceProperties::new();
    properties.insert(MODE_PROPERTY.to_string(), code);
    properties
}
