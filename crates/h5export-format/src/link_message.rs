//! Link messages (type 0x0006) and the link info message (type 0x0002)
//! that announces a compact-storage group.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::error::FormatError;
use crate::util::{ensure_len, read_address, read_sized, write_sized, UNDEFINED_ADDRESS};

const LINK_VERSION: u8 = 1;
const LINK_TYPE_HARD: u8 = 0;
const LINK_TYPE_SOFT: u8 = 1;

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// An object header address.
    Hard(u64),
    /// A path, resolved on access.
    Soft(String),
    /// External (type 64) or other user-defined link; the payload is opaque.
    UserDefined { link_type: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub name: String,
    pub target: LinkTarget,
    /// Name is UTF-8 rather than ASCII.
    pub utf8: bool,
    pub creation_order: Option<u64>,
}

impl LinkMessage {
    pub fn hard(name: &str, address: u64) -> Self {
        Self {
            name: name.into(),
            target: LinkTarget::Hard(address),
            utf8: !name.is_ascii(),
            creation_order: None,
        }
    }

    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != LINK_VERSION {
            return Err(FormatError::InvalidLinkVersion(data[0]));
        }
        let flags = data[1];
        let mut pos = 2;

        let link_type = if flags & 0x08 != 0 {
            ensure_len(data, pos, 1)?;
            pos += 1;
            data[pos - 1]
        } else {
            LINK_TYPE_HARD
        };
        let creation_order = if flags & 0x04 != 0 {
            let v = read_sized(data, pos, 8)?;
            pos += 8;
            Some(v)
        } else {
            None
        };
        let utf8 = if flags & 0x10 != 0 {
            ensure_len(data, pos, 1)?;
            pos += 1;
            match data[pos - 1] {
                0 => false,
                1 => true,
                other => return Err(FormatError::InvalidCharacterSet(other)),
            }
        } else {
            false
        };

        let width = 1u8 << (flags & 0x03);
        let name_len = read_sized(data, pos, width)? as usize;
        pos += width as usize;
        ensure_len(data, pos, name_len)?;
        let name = String::from_utf8_lossy(&data[pos..pos + name_len]).into_owned();
        pos += name_len;

        let target = match link_type {
            LINK_TYPE_HARD => LinkTarget::Hard(read_sized(data, pos, offset_size)?),
            LINK_TYPE_SOFT => {
                let len = read_sized(data, pos, 2)? as usize;
                ensure_len(data, pos + 2, len)?;
                LinkTarget::Soft(String::from_utf8_lossy(&data[pos + 2..pos + 2 + len]).into_owned())
            }
            t if t >= 64 => {
                let len = read_sized(data, pos, 2)? as usize;
                ensure_len(data, pos + 2, len)?;
                LinkTarget::UserDefined {
                    link_type: t,
                    data: data[pos + 2..pos + 2 + len].to_vec(),
                }
            }
            other => return Err(FormatError::InvalidLinkType(other)),
        };

        Ok(LinkMessage {
            name,
            target,
            utf8,
            creation_order,
        })
    }

    pub fn serialize(&self, offset_size: u8) -> Vec<u8> {
        let name = self.name.as_bytes();
        let (width_code, width) = match name.len() {
            0..=0xFF => (0u8, 1u8),
            0x100..=0xFFFF => (1, 2),
            _ => (2, 4),
        };
        let link_type = match &self.target {
            LinkTarget::Hard(_) => LINK_TYPE_HARD,
            LinkTarget::Soft(_) => LINK_TYPE_SOFT,
            LinkTarget::UserDefined { link_type, .. } => *link_type,
        };

        let mut flags = width_code;
        if link_type != LINK_TYPE_HARD {
            flags |= 0x08;
        }
        if self.creation_order.is_some() {
            flags |= 0x04;
        }
        if self.utf8 {
            flags |= 0x10;
        }

        let mut buf = Vec::with_capacity(4 + name.len() + offset_size as usize);
        buf.push(LINK_VERSION);
        buf.push(flags);
        if link_type != LINK_TYPE_HARD {
            buf.push(link_type);
        }
        if let Some(order) = self.creation_order {
            buf.extend_from_slice(&order.to_le_bytes());
        }
        if self.utf8 {
            buf.push(1);
        }
        write_sized(&mut buf, name.len() as u64, width);
        buf.extend_from_slice(name);

        match &self.target {
            LinkTarget::Hard(addr) => write_sized(&mut buf, *addr, offset_size),
            LinkTarget::Soft(path) => {
                buf.extend_from_slice(&(path.len() as u16).to_le_bytes());
                buf.extend_from_slice(path.as_bytes());
            }
            LinkTarget::UserDefined { data, .. } => {
                buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
                buf.extend_from_slice(data);
            }
        }
        buf
    }
}

/// Link info message: where a group's links live.
///
/// Compact groups store their links as link messages in the object header
/// and leave the fractal heap address undefined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub max_creation_index: Option<u64>,
    pub fractal_heap_address: Option<u64>,
    pub name_index_address: Option<u64>,
}

impl LinkInfo {
    pub fn compact() -> Self {
        Self {
            max_creation_index: None,
            fractal_heap_address: None,
            name_index_address: None,
        }
    }

    /// Links are kept in a fractal heap rather than the header.
    pub fn is_dense(&self) -> bool {
        self.fractal_heap_address.is_some()
    }

    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkInfo, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::InvalidLinkVersion(data[0]));
        }
        let flags = data[1];
        let mut pos = 2;
        let max_creation_index = if flags & 0x01 != 0 {
            let v = read_sized(data, pos, 8)?;
            pos += 8;
            Some(v)
        } else {
            None
        };
        let fractal_heap_address = read_address(data, pos, offset_size)?;
        pos += offset_size as usize;
        let name_index_address = read_address(data, pos, offset_size)?;
        Ok(LinkInfo {
            max_creation_index,
            fractal_heap_address,
            name_index_address,
        })
    }

    pub fn serialize(&self, offset_size: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + 8 + 2 * offset_size as usize);
        buf.push(0);
        buf.push(self.max_creation_index.is_some() as u8);
        if let Some(idx) = self.max_creation_index {
            buf.extend_from_slice(&idx.to_le_bytes());
        }
        for addr in [self.fractal_heap_address, self.name_index_address] {
            write_sized(&mut buf, addr.unwrap_or(UNDEFINED_ADDRESS), offset_size);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_link_layout() {
        let bytes = LinkMessage::hard("data", 0x1234).serialize(8);
        assert_eq!(&bytes[..4], &[1, 0, 4, b'd']);
        assert_eq!(bytes.len(), 2 + 1 + 4 + 8);
        let msg = LinkMessage::parse(&bytes, 8).unwrap();
        assert_eq!(msg.name, "data");
        assert_eq!(msg.target, LinkTarget::Hard(0x1234));
    }

    #[test]
    fn soft_link_with_creation_order() {
        let msg = LinkMessage {
            name: "alias".into(),
            target: LinkTarget::Soft("/grid/values".into()),
            utf8: false,
            creation_order: Some(7),
        };
        let bytes = msg.serialize(8);
        assert_eq!(bytes[1] & 0x0C, 0x0C);
        assert_eq!(LinkMessage::parse(&bytes, 8).unwrap(), msg);
    }

    #[test]
    fn external_link_payload_is_kept() {
        let msg = LinkMessage {
            name: "ext".into(),
            target: LinkTarget::UserDefined {
                link_type: 64,
                data: b"\0other.h5\0/x\0".to_vec(),
            },
            utf8: false,
            creation_order: None,
        };
        assert_eq!(LinkMessage::parse(&msg.serialize(4), 4).unwrap(), msg);
    }

    #[test]
    fn utf8_name_sets_charset() {
        let msg = LinkMessage::hard("températures", 96);
        assert!(msg.utf8);
        let parsed = LinkMessage::parse(&msg.serialize(8), 8).unwrap();
        assert_eq!(parsed.name, "températures");
        assert!(parsed.utf8);
    }

    #[test]
    fn reserved_link_type_rejected() {
        let bytes = [1, 0x08, 5, 1, b'x', 0, 0];
        assert_eq!(LinkMessage::parse(&bytes, 8), Err(FormatError::InvalidLinkType(5)));
    }

    #[test]
    fn link_info_compact_and_dense() {
        let compact = LinkInfo::compact();
        let bytes = compact.serialize(8);
        assert_eq!(bytes.len(), 18);
        let parsed = LinkInfo::parse(&bytes, 8).unwrap();
        assert!(!parsed.is_dense());

        let dense = LinkInfo {
            max_creation_index: Some(3),
            fractal_heap_address: Some(4096),
            name_index_address: Some(8192),
        };
        let parsed = LinkInfo::parse(&dense.serialize(8), 8).unwrap();
        assert_eq!(parsed, dense);
        assert!(parsed.is_dense());
    }
}
