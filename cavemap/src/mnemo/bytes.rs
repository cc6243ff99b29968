//! Byte-level helpers for the Mnemo dump format.
//!
//! Dump values may arrive as signed 8-bit integers (the file form writes
//! them as decimal numbers in `-128..=255`). Each value is mapped through
//! 8-bit two's complement on its own, and only then are two bytes joined
//! into a 16-bit big-endian word. A 16-bit quantity is never sign-extended.

/// Maps a raw dump value onto its unsigned byte.
///
/// `0..=255` is returned unchanged; `-128..=-1` maps to `128..=255`.
/// Anything else is not a byte and yields `None`.
#[inline]
pub fn to_unsigned_byte(raw: i16) -> Option<u8> {
    match raw {
        0..=255 => Some(raw as u8),
        -128..=-1 => Some((raw + 256) as u8),
        _ => None,
    }
}

/// Joins two unsigned bytes into a big-endian word.
///
/// Equivalent to concatenating the two-digit hex forms of `hi` and `lo`.
#[inline]
pub fn read_u16_be(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// Decodes a word from two raw (possibly negative) dump values.
pub fn decode_raw_pair(hi: i16, lo: i16) -> Option<u16> {
    Some(read_u16_be(to_unsigned_byte(hi)?, to_unsigned_byte(lo)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_values_pass_through() {
        assert_eq!(to_unsigned_byte(0), Some(0));
        assert_eq!(to_unsigned_byte(16), Some(16));
        assert_eq!(to_unsigned_byte(255), Some(255));
    }

    #[test]
    fn test_negative_values_use_twos_complement() {
        assert_eq!(to_unsigned_byte(-1), Some(0xFF));
        assert_eq!(to_unsigned_byte(-56), Some(0xC8));
        assert_eq!(to_unsigned_byte(-128), Some(0x80));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert_eq!(to_unsigned_byte(256), None);
        assert_eq!(to_unsigned_byte(-129), None);
        assert_eq!(to_unsigned_byte(i16::MAX), None);
    }

    #[test]
    fn test_fixed_vectors() {
        // 0xFF, 0x10 -> "ff" + "10"
        assert_eq!(read_u16_be(0xFF, 0x10), 0xFF10);
        assert_eq!(decode_raw_pair(255, 16), Some(65296));
        // -1 is the same byte as 0xFF
        assert_eq!(decode_raw_pair(-1, 16), Some(65296));
        // 0x01, 0x2C -> 300
        assert_eq!(decode_raw_pair(1, 44), Some(300));
        // both bytes negative: 0x80, 0xFF
        assert_eq!(decode_raw_pair(-128, -1), Some(0x80FF));
        // low byte negative only: 0x00, 0xC8
        assert_eq!(decode_raw_pair(0, -56), Some(200));
    }

    #[test]
    fn test_pair_with_invalid_byte() {
        assert_eq!(decode_raw_pair(300, 1), None);
        assert_eq!(decode_raw_pair(1, -200), None);
    }
}
