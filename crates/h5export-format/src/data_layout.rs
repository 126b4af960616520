//! Data layout messages (type 0x0008), versions 3 and 4.
//!
//! Compact and contiguous layouts are decoded fully. Chunked and virtual
//! layouts are only recognized, since their index structures cannot be
//! moved when a file is rewritten.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::util::{ensure_len, read_address, read_sized, write_sized, UNDEFINED_ADDRESS};

const LAYOUT_VERSION: u8 = 3;
const CLASS_COMPACT: u8 = 0;
const CLASS_CONTIGUOUS: u8 = 1;
const CLASS_CHUNKED: u8 = 2;
const CLASS_VIRTUAL: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Raw data inline in the message.
    Compact(Vec<u8>),
    /// One block of `size` bytes; `address` is `None` until storage is allocated.
    Contiguous { address: Option<u64>, size: u64 },
    Chunked,
    Virtual,
}

impl DataLayout {
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }
        match data[1] {
            CLASS_COMPACT => {
                let size = read_sized(data, 2, 2)? as usize;
                ensure_len(data, 4, size)?;
                Ok(DataLayout::Compact(data[4..4 + size].to_vec()))
            }
            CLASS_CONTIGUOUS => {
                let address = read_address(data, 2, offset_size)?;
                let size = read_sized(data, 2 + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous { address, size })
            }
            CLASS_CHUNKED => Ok(DataLayout::Chunked),
            CLASS_VIRTUAL if version == 4 => Ok(DataLayout::Virtual),
            other => Err(FormatError::InvalidLayoutClass(other)),
        }
    }

    /// Encode as a version 3 message. Chunked and virtual layouts have no
    /// encoding here.
    pub fn serialize(&self, offset_size: u8, length_size: u8) -> Result<Vec<u8>, FormatError> {
        let mut buf = Vec::new();
        buf.push(LAYOUT_VERSION);
        match self {
            DataLayout::Compact(raw) => {
                if raw.len() > u16::MAX as usize {
                    return Err(FormatError::UnsupportedStorage("compact data over 64 KiB"));
                }
                buf.push(CLASS_COMPACT);
                buf.extend_from_slice(&(raw.len() as u16).to_le_bytes());
                buf.extend_from_slice(raw);
            }
            DataLayout::Contiguous { address, size } => {
                buf.push(CLASS_CONTIGUOUS);
                write_sized(&mut buf, address.unwrap_or(UNDEFINED_ADDRESS), offset_size);
                write_sized(&mut buf, *size, length_size);
            }
            DataLayout::Chunked => return Err(FormatError::UnsupportedStorage("chunked dataset")),
            DataLayout::Virtual => return Err(FormatError::UnsupportedStorage("virtual dataset")),
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_roundtrip() {
        let layout = DataLayout::Contiguous {
            address: Some(0x800),
            size: 96,
        };
        let bytes = layout.serialize(8, 8).unwrap();
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[..2], &[3, 1]);
        assert_eq!(DataLayout::parse(&bytes, 8, 8).unwrap(), layout);
    }

    #[test]
    fn unallocated_contiguous() {
        let layout = DataLayout::Contiguous {
            address: None,
            size: 40,
        };
        let bytes = layout.serialize(4, 4).unwrap();
        assert_eq!(&bytes[2..6], &[0xFF; 4]);
        assert_eq!(DataLayout::parse(&bytes, 4, 4).unwrap(), layout);
    }

    #[test]
    fn compact_roundtrip() {
        let layout = DataLayout::Compact(vec![1, 2, 3, 4]);
        let bytes = layout.serialize(8, 8).unwrap();
        assert_eq!(bytes, vec![3, 0, 4, 0, 1, 2, 3, 4]);
        assert_eq!(DataLayout::parse(&bytes, 8, 8).unwrap(), layout);
    }

    #[test]
    fn v4_chunked_is_recognized_but_not_encodable() {
        let raw = [4, 2, 0, 1, 8, 0, 0, 0];
        let layout = DataLayout::parse(&raw, 8, 8).unwrap();
        assert_eq!(layout, DataLayout::Chunked);
        assert!(matches!(
            layout.serialize(8, 8),
            Err(FormatError::UnsupportedStorage(_))
        ));
    }

    #[test]
    fn old_versions_rejected() {
        assert_eq!(
            DataLayout::parse(&[2, 1, 1], 8, 8),
            Err(FormatError::InvalidLayoutVersion(2))
        );
        assert_eq!(
            DataLayout::parse(&[3, 3], 8, 8),
            Err(FormatError::InvalidLayoutClass(3))
        );
    }
}
