//! Text form of a Mnemo dump.
//!
//! A dump file is a single line of `;`-separated decimal byte values, for
//! example `2;24;3;9;14;30;83;84;68;0;1;...`. Values may be written signed
//! (`-1` for `255`). The trailing separator is optional and surrounding
//! whitespace is ignored.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::bytes::to_unsigned_byte;
use super::error::{ImportError, ImportResult};

/// Separator between values.
pub const DUMP_SEPARATOR: char = ';';

/// Parses the text form into unsigned bytes.
pub fn parse_dump(text: &str) -> ImportResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(text.len() / 3);

    for (index, token) in text
        .split(DUMP_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .enumerate()
    {
        let raw: i16 = token.parse().map_err(|_| ImportError::MalformedDumpFile {
            index,
            reason: format!("'{}' is not an integer", token),
        })?;
        let byte = to_unsigned_byte(raw).ok_or_else(|| ImportError::MalformedDumpFile {
            index,
            reason: format!("{} is outside -128..=255", raw),
        })?;
        bytes.push(byte);
    }

    Ok(bytes)
}

/// Formats bytes in the text form, with a trailing separator.
pub fn format_dump(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() * 4);
    for byte in bytes {
        text.push_str(&byte.to_string());
        text.push(DUMP_SEPARATOR);
    }
    text
}

/// Reads and parses a dump file.
pub fn read_dump_file(path: &Path) -> ImportResult<Vec<u8>> {
    let text = fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
    let bytes = parse_dump(&text)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read dump file");
    Ok(bytes)
}

/// Writes bytes to a dump file, replacing any existing file.
pub fn write_dump_file(path: &Path, bytes: &[u8]) -> ImportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ImportError::io(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, format_dump(bytes)).map_err(|e| ImportError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| ImportError::io(path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote dump file");
    Ok(())
}
