//! Numeric datatype messages (type 0x0003): fixed-point and IEEE floating-point.
//!
//! Other datatype classes are never interpreted here. Datasets that use
//! them keep their datatype message as raw bytes.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder as _, LittleEndian};

use crate::error::FormatError;
use crate::util::ensure_len;

/// Byte order of a numeric element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the machine this code runs on.
    pub const NATIVE: ByteOrder = if cfg!(target_endian = "big") {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    };
}

const CLASS_FIXED: u8 = 0;
const CLASS_FLOAT: u8 = 1;
const CLASS_TIME: u8 = 2;
const CLASS_STRING: u8 = 3;
const CLASS_BITFIELD: u8 = 4;
const CLASS_OPAQUE: u8 = 5;
const CLASS_COMPOUND: u8 = 6;
const CLASS_REFERENCE: u8 = 7;
const CLASS_ENUM: u8 = 8;
const CLASS_VARIABLE_LENGTH: u8 = 9;
const CLASS_ARRAY: u8 = 10;
const DATATYPE_VERSION: u8 = 1;

/// A numeric HDF5 datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Class 0: integers.
    FixedPoint {
        size: u32,
        byte_order: ByteOrder,
        signed: bool,
        bit_offset: u16,
        bit_precision: u16,
    },
    /// Class 1: floating point.
    FloatingPoint {
        size: u32,
        byte_order: ByteOrder,
        sign_location: u8,
        bit_offset: u16,
        bit_precision: u16,
        exponent_location: u8,
        exponent_size: u8,
        mantissa_location: u8,
        mantissa_size: u8,
        exponent_bias: u32,
    },
}

/// How element bytes must be transformed to move between two datatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Layouts are identical.
    Identity,
    /// Same layout, opposite byte order: reverse each element of this width.
    ByteSwap(usize),
}

impl Conversion {
    /// Apply to a buffer of whole elements.
    pub fn apply(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Conversion::Identity => bytes.to_vec(),
            Conversion::ByteSwap(width) => {
                let mut out = bytes.to_vec();
                for elem in out.chunks_exact_mut(width) {
                    elem.reverse();
                }
                out
            }
        }
    }
}

impl Datatype {
    /// Integer of `size` bytes using every bit.
    pub fn fixed(size: u32, signed: bool, byte_order: ByteOrder) -> Datatype {
        Datatype::FixedPoint {
            size,
            byte_order,
            signed,
            bit_offset: 0,
            bit_precision: (size * 8) as u16,
        }
    }

    /// IEEE 754 binary32 (`size == 4`) or binary64 (otherwise).
    pub fn float(size: u32, byte_order: ByteOrder) -> Datatype {
        let (exponent_location, exponent_size, mantissa_size, exponent_bias) = if size == 4 {
            (23, 8, 23, 127)
        } else {
            (52, 11, 52, 1023)
        };
        let bits = (size * 8) as u16;
        Datatype::FloatingPoint {
            size,
            byte_order,
            sign_location: (bits - 1) as u8,
            bit_offset: 0,
            bit_precision: bits,
            exponent_location,
            exponent_size,
            mantissa_location: 0,
            mantissa_size,
            exponent_bias,
        }
    }

    pub fn i32_le() -> Datatype {
        Self::fixed(4, true, ByteOrder::LittleEndian)
    }

    pub fn f32_le() -> Datatype {
        Self::float(4, ByteOrder::LittleEndian)
    }

    pub fn f64_le() -> Datatype {
        Self::float(8, ByteOrder::LittleEndian)
    }

    /// Bytes per element.
    pub fn type_size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. } | Datatype::FloatingPoint { size, .. } => *size,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        match self {
            Datatype::FixedPoint { byte_order, .. } | Datatype::FloatingPoint { byte_order, .. } => {
                *byte_order
            }
        }
    }

    /// The same type with a different byte order.
    pub fn with_byte_order(&self, order: ByteOrder) -> Datatype {
        let mut dt = self.clone();
        match &mut dt {
            Datatype::FixedPoint { byte_order, .. } | Datatype::FloatingPoint { byte_order, .. } => {
                *byte_order = order
            }
        }
        dt
    }

    /// How to turn elements of `self` into elements of `to`.
    ///
    /// Only conversions that preserve every value exactly are offered:
    /// the two types must agree on everything except byte order.
    pub fn conversion_to(&self, to: &Datatype) -> Result<Conversion, FormatError> {
        if self.with_byte_order(to.byte_order()) != *to {
            return Err(FormatError::TypeMismatch);
        }
        if self.byte_order() == to.byte_order() || self.type_size() == 1 {
            Ok(Conversion::Identity)
        } else {
            Ok(Conversion::ByteSwap(self.type_size() as usize))
        }
    }

    /// Parse a datatype message body.
    pub fn parse(data: &[u8]) -> Result<Datatype, FormatError> {
        if data.len() < 8 {
            return Err(FormatError::UnexpectedEof {
                expected: 8,
                available: data.len(),
            });
        }
        let class = data[0] & 0x0F;
        let bits = [data[1], data[2], data[3]];
        let size = LittleEndian::read_u32(&data[4..8]);
        let props = &data[8..];
        let byte_order = if bits[0] & 0x01 == 0 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };

        match class {
            CLASS_FIXED => {
                require(props, 4)?;
                Ok(Datatype::FixedPoint {
                    size,
                    byte_order,
                    signed: bits[0] & 0x08 != 0,
                    bit_offset: LittleEndian::read_u16(&props[0..2]),
                    bit_precision: LittleEndian::read_u16(&props[2..4]),
                })
            }
            CLASS_FLOAT => {
                // VAX ordering sets bit 6
                if bits[0] & 0x40 != 0 {
                    return Err(FormatError::UnsupportedDatatypeClass(class));
                }
                require(props, 12)?;
                Ok(Datatype::FloatingPoint {
                    size,
                    byte_order,
                    sign_location: bits[1],
                    bit_offset: LittleEndian::read_u16(&props[0..2]),
                    bit_precision: LittleEndian::read_u16(&props[2..4]),
                    exponent_location: props[4],
                    exponent_size: props[5],
                    mantissa_location: props[6],
                    mantissa_size: props[7],
                    exponent_bias: LittleEndian::read_u32(&props[8..12]),
                })
            }
            other => Err(FormatError::UnsupportedDatatypeClass(other)),
        }
    }

    /// Encode as a datatype message body.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20);
        match self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
                bit_offset,
                bit_precision,
            } => {
                let mut b0 = order_bit(*byte_order);
                if *signed {
                    b0 |= 0x08;
                }
                header(&mut buf, CLASS_FIXED, [b0, 0, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
            }
            Datatype::FloatingPoint {
                size,
                byte_order,
                sign_location,
                bit_offset,
                bit_precision,
                exponent_location,
                exponent_size,
                mantissa_location,
                mantissa_size,
                exponent_bias,
            } => {
                // bits 4-5 = 2: implied leading mantissa bit
                let b0 = order_bit(*byte_order) | 0x20;
                header(&mut buf, CLASS_FLOAT, [b0, *sign_location, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf.extend_from_slice(&[
                    *exponent_location,
                    *exponent_size,
                    *mantissa_location,
                    *mantissa_size,
                ]);
                buf.extend_from_slice(&exponent_bias.to_le_bytes());
            }
        }
        buf
    }
}

fn order_bit(order: ByteOrder) -> u8 {
    match order {
        ByteOrder::LittleEndian => 0,
        ByteOrder::BigEndian => 1,
    }
}

fn header(buf: &mut Vec<u8>, class: u8, bits: [u8; 3], size: u32) {
    buf.push((DATATYPE_VERSION << 4) | class);
    buf.extend_from_slice(&bits);
    buf.extend_from_slice(&size.to_le_bytes());
}

fn require(props: &[u8], n: usize) -> Result<(), FormatError> {
    if props.len() < n {
        return Err(FormatError::UnexpectedEof {
            expected: 8 + n,
            available: 8 + props.len(),
        });
    }
    Ok(())
}

/// Deepest member nesting followed by [`refers_outside`].
const MAX_NESTING: usize = 32;

/// Does a raw datatype message, of any class, describe elements that point
/// elsewhere in the file?
///
/// Variable-length elements live in global heap collections and reference
/// elements hold object addresses. Both are found through compound, array
/// and enumeration members as well as at the top level.
pub fn refers_outside(raw: &[u8]) -> Result<bool, FormatError> {
    scan(raw, 0, 0).map(|(found, _)| found)
}

/// Walk the datatype at `pos`. Returns whether it refers outside the
/// element and, when it does not, where its encoding ends.
fn scan(data: &[u8], pos: usize, depth: usize) -> Result<(bool, usize), FormatError> {
    if depth > MAX_NESTING {
        return Err(FormatError::UnsupportedStorage("datatype nesting this deep"));
    }
    ensure_len(data, pos, 8)?;
    let class = data[pos] & 0x0F;
    let version = data[pos] >> 4;
    let members = u16::from_le_bytes([data[pos + 1], data[pos + 2]]) as usize;
    let size = LittleEndian::read_u32(&data[pos + 4..pos + 8]);
    let props = pos + 8;

    let end = match class {
        CLASS_REFERENCE | CLASS_VARIABLE_LENGTH => return Ok((true, props)),
        CLASS_FIXED | CLASS_BITFIELD => props + 4,
        CLASS_FLOAT => props + 12,
        CLASS_TIME => props + 2,
        CLASS_STRING => props,
        CLASS_OPAQUE => props + ((data[pos + 1] as usize + 7) & !7),
        CLASS_COMPOUND => {
            let mut at = props;
            for _ in 0..members {
                at = skip_name(data, at, version < 3)?;
                at += match version {
                    // offset, rank, reserved, permutation, reserved, four dimension sizes
                    1 => 4 + 1 + 3 + 4 + 4 + 16,
                    2 => 4,
                    3 => offset_width(size),
                    _ => return Err(FormatError::InvalidDatatypeVersion { class, version }),
                };
                let (found, next) = scan(data, at, depth + 1)?;
                if found {
                    return Ok((true, next));
                }
                at = next;
            }
            at
        }
        CLASS_ENUM => {
            let (found, mut at) = scan(data, props, depth + 1)?;
            if found {
                return Ok((true, at));
            }
            let base_size = LittleEndian::read_u32(&data[props + 4..props + 8]) as usize;
            for _ in 0..members {
                at = skip_name(data, at, version < 3)?;
            }
            at.saturating_add(members.saturating_mul(base_size))
        }
        CLASS_ARRAY => {
            ensure_len(data, props, 1)?;
            let rank = data[props] as usize;
            let base = match version {
                // rank, reserved, dimension sizes, permutation
                2 => props + 4 + rank * 8,
                3 => props + 1 + rank * 4,
                _ => return Err(FormatError::InvalidDatatypeVersion { class, version }),
            };
            return scan(data, base, depth + 1);
        }
        other => return Err(FormatError::UnsupportedDatatypeClass(other)),
    };
    ensure_len(data, pos, end - pos)?;
    Ok((false, end))
}

/// Step over a NUL-terminated member name, padded to eight bytes in the
/// older encodings.
fn skip_name(data: &[u8], pos: usize, padded: bool) -> Result<usize, FormatError> {
    let tail = data.get(pos..).unwrap_or_default();
    let nul = tail.iter().position(|&b| b == 0).ok_or(FormatError::UnexpectedEof {
        expected: data.len() + 1,
        available: data.len(),
    })?;
    let len = if padded { (nul + 8) & !7 } else { nul + 1 };
    Ok(pos + len)
}

/// Width of a compound member offset: the fewest bytes that hold `size`.
fn offset_width(size: u32) -> usize {
    match size {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

/// Raw datatype messages of classes [`Datatype`] does not model, shared by
/// the reader tests.
#[cfg(test)]
pub(crate) mod fixture {
    /// Variable-length string of one-byte characters.
    pub(crate) fn vlen_string() -> Vec<u8> {
        let mut raw = vec![0x19, 0x01, 0, 0, 16, 0, 0, 0];
        raw.extend_from_slice(&[0x10, 0, 0, 0, 1, 0, 0, 0, 0, 0, 8, 0]);
        raw
    }

    /// Object reference.
    pub(crate) fn object_reference() -> Vec<u8> {
        vec![0x17, 0, 0, 0, 8, 0, 0, 0]
    }
}
