//! Attribute messages (type 0x000C).
//!
//! Attributes are carried through a rewrite as raw bytes; this module only
//! reads far enough to reach the datatype, so the reader can tell whether
//! the attribute value points elsewhere in the file.

use crate::error::FormatError;
use crate::util::ensure_len;

/// Flag bit: the datatype field is a shared message.
const SHARED_DATATYPE: u8 = 0x01;

/// The parts of an attribute message the reader inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeMessage<'a> {
    /// Encoded datatype, or the shared-message record when
    /// `shared_datatype` is set.
    pub datatype: &'a [u8],
    /// The datatype lives in a committed datatype object.
    pub shared_datatype: bool,
}

impl<'a> AttributeMessage<'a> {
    pub fn parse(data: &'a [u8]) -> Result<AttributeMessage<'a>, FormatError> {
        ensure_len(data, 0, 8)?;
        let version = data[0];
        let name_size = u16::from_le_bytes([data[2], data[3]]) as usize;
        let datatype_size = u16::from_le_bytes([data[4], data[5]]) as usize;

        let (datatype_at, shared_datatype) = match version {
            // name padded to eight bytes, no flags
            1 => (8 + pad8(name_size), false),
            2 => (8 + name_size, data[1] & SHARED_DATATYPE != 0),
            // one more header byte: name character set
            3 => (9 + name_size, data[1] & SHARED_DATATYPE != 0),
            v => return Err(FormatError::InvalidAttributeVersion(v)),
        };
        ensure_len(data, datatype_at, datatype_size)?;
        Ok(AttributeMessage {
            datatype: &data[datatype_at..datatype_at + datatype_size],
            shared_datatype,
        })
    }
}

fn pad8(x: usize) -> usize {
    (x + 7) & !7
}
