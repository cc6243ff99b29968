//! Mnemo survey import.
//!
//! A Mnemo stores surveys as a flat byte dump. This module gets that dump
//! off the device (or from a saved `;`-separated text file) and decodes it
//! into the [`Survey`](crate::survey::Survey) model.
//!
//! # Example
//!
//! ```
//! use cavemap::mnemo::{parse_dump, DecodeOptions, DumpDecoder};
//! use chrono::{TimeZone, Utc};
//!
//! // header, then section "STD" #1 with one point record
//! let text = "2;24;3;9;14;30;83;84;68;0;1;\
//!             0;1;0;0;3;132;1;44;0;50;0;120;0;0;0;0;";
//! let bytes = parse_dump(text).unwrap();
//!
//! let options = DecodeOptions::new(Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap());
//! let decoded = DumpDecoder::new(options).decode(&bytes);
//!
//! assert_eq!(decoded.survey.sections.len(), 1);
//! assert!(decoded.warnings.is_empty());
//!
//! let point = &decoded.survey.sections[0].points[0];
//! assert_eq!(point.azimuth_out, 90.0);
//! assert_eq!(point.length_out, 3.0);
//! ```

mod bytes;
mod decoder;
mod device;
mod dump_file;
mod error;

pub use bytes::{decode_raw_pair, read_u16_be, to_unsigned_byte};
pub use decoder::{
    DecodeOptions, DecodeWarning, DecodedDump, DumpDecoder, DEFAULT_DEVICE_NAME, HEADER_LEN,
    MODE_PROPERTY, POINT_RECORD_LEN, SECTION_HEADER_LEN,
};
pub use device::{
    discover_device, import_from_device, read_from_device, DeviceConfig, DeviceLink,
    SerialDevice, DEFAULT_POLL_CYCLES, DEFAULT_POLL_INTERVAL, DEFAULT_PORT_PATTERNS,
};
pub use dump_file::{format_dump, parse_dump, read_dump_file, write_dump_file, DUMP_SEPARATOR};
pub use error::{ImportError, ImportResult};
