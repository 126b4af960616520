//! Little-endian field helpers shared by the message parsers.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// Address value HDF5 uses for "undefined".
pub(crate) const UNDEFINED_ADDRESS: u64 = u64::MAX;

pub(crate) fn ensure_len(data: &[u8], pos: usize, needed: usize) -> Result<(), FormatError> {
    match pos.checked_add(needed) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(FormatError::UnexpectedEof {
            expected: pos.saturating_add(needed),
            available: data.len(),
        }),
    }
}

/// Read an unsigned integer of `size` bytes (LE) at `pos`.
pub(crate) fn read_sized(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    ensure_len(data, pos, size as usize)?;
    let slice = &data[pos..pos + size as usize];
    Ok(match size {
        1 => slice[0] as u64,
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

/// Read an address, mapping the all-ones pattern to `None`.
pub(crate) fn read_address(data: &[u8], pos: usize, size: u8) -> Result<Option<u64>, FormatError> {
    ensure_len(data, pos, size as usize)?;
    if data[pos..pos + size as usize].iter().all(|&b| b == 0xFF) {
        return Ok(None);
    }
    read_sized(data, pos, size).map(Some)
}

/// Append `val` truncated to `size` bytes (LE).
pub(crate) fn write_sized(buf: &mut Vec<u8>, val: u64, size: u8) {
    let bytes = val.to_le_bytes();
    buf.extend_from_slice(&bytes[..size as usize]);
}

pub(crate) fn validate_sizes(offset_size: u8, length_size: u8) -> Result<(), FormatError> {
    if !matches!(offset_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidOffsetSize(offset_size));
    }
    if !matches!(length_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidLengthSize(length_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_reads() {
        let data = [0x34, 0x12, 0x78, 0x56, 0, 0, 0, 0];
        assert_eq!(read_sized(&data, 0, 2), Ok(0x1234));
        assert_eq!(read_sized(&data, 0, 4), Ok(0x5678_1234));
        assert_eq!(read_sized(&data, 0, 8), Ok(0x5678_1234));
        assert_eq!(read_sized(&data, 1, 1), Ok(0x12));
        assert_eq!(read_sized(&data, 0, 3), Err(FormatError::InvalidOffsetSize(3)));
    }

    #[test]
    fn undefined_address() {
        assert_eq!(read_address(&[0xFF; 8], 0, 8), Ok(None));
        assert_eq!(read_address(&[0xFF, 0xFF, 0xFF, 0xFE], 0, 4), Ok(Some(0xFEFF_FFFF)));
    }

    #[test]
    fn eof_is_reported() {
        assert_eq!(
            read_sized(&[1, 2], 1, 4),
            Err(FormatError::UnexpectedEof { expected: 5, available: 2 })
        );
    }

    #[test]
    fn write_truncates_to_width() {
        let mut buf = Vec::new();
        write_sized(&mut buf, 0x0102_0304, 2);
        write_sized(&mut buf, u64::MAX, 4);
        assert_eq!(buf, vec![0x04, 0x03, 0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
