//! Object header parsing, versions 1 and 2.
//!
//! Both versions are flattened into a list of [`HeaderMessage`]s; continuation
//! blocks are followed and NIL padding is dropped.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::util::{ensure_len, read_sized};

/// `OHDR`: start of a v2 object header.
pub const OHDR_SIGNATURE: [u8; 4] = *b"OHDR";
/// `OCHK`: start of a v2 continuation chunk.
pub const OCHK_SIGNATURE: [u8; 4] = *b"OCHK";

/// Message flag: the message content lives in the shared message heap.
pub const MSG_FLAG_SHARED: u8 = 0x02;
/// Message flag: a reader that doesn't know the type must fail.
pub const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x08;

/// v2 header flag: attribute creation order is tracked, so every message
/// header carries a 2-byte creation index.
pub const OH_FLAG_CREATION_ORDER: u8 = 0x04;
/// v2 header flag: attribute phase-change thresholds are stored.
pub const OH_FLAG_ATTR_PHASE: u8 = 0x10;
/// v2 header flag: four timestamps are stored.
pub const OH_FLAG_TIMES: u8 = 0x20;

/// One message from an object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    /// Creation index, present when the header tracks creation order.
    pub creation_order: Option<u16>,
    pub data: Vec<u8>,
}

impl HeaderMessage {
    pub fn new(msg_type: MessageType, data: Vec<u8>) -> Self {
        Self {
            msg_type,
            flags: 0,
            creation_order: None,
            data,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.flags & MSG_FLAG_SHARED != 0
    }
}

/// A parsed object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// 1 or 2.
    pub version: u8,
    /// Non-NIL, non-continuation messages from every chunk, in file order.
    pub messages: Vec<HeaderMessage>,
    /// v2 header flags; 0 for v1.
    pub flags: u8,
    /// Stored reference count (v1 only).
    pub reference_count: Option<u32>,
    /// Access, modification, change and birth times (v2 with [`OH_FLAG_TIMES`]).
    pub times: Option<[u32; 4]>,
}

/// Which encoding a run of messages uses.
#[derive(Clone, Copy)]
enum Encoding {
    V1,
    V2 { creation_order: bool },
}

impl Encoding {
    fn message_header_len(self) -> usize {
        match self {
            Encoding::V1 => 8,
            Encoding::V2 { creation_order } => {
                if creation_order {
                    6
                } else {
                    4
                }
            }
        }
    }
}

impl ObjectHeader {
    /// Parse the object header at `offset`.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 4)?;
        if data[offset..offset + 4] == OHDR_SIGNATURE {
            Self::parse_v2(data, offset, offset_size, length_size)
        } else {
            Self::parse_v1(data, offset, offset_size, length_size)
        }
    }

    /// All messages of a given type.
    pub fn messages_of(&self, ty: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == ty)
    }

    /// The first message of a given type.
    pub fn find(&self, ty: MessageType) -> Option<&HeaderMessage> {
        self.messages_of(ty).next()
    }

    fn parse_v1(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        // version, reserved, message count(2), refcount(4), header size(4),
        // then 4 bytes of padding to align the first message to 8.
        ensure_len(data, offset, 16)?;
        let version = data[offset];
        if version != 1 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let reference_count = LittleEndian::read_u32(&data[offset + 4..offset + 8]);
        let size = LittleEndian::read_u32(&data[offset + 8..offset + 12]) as usize;

        let mut chunks = Vec::new();
        chunks.push((offset + 16, size));
        let messages = walk_chunks(data, chunks, Encoding::V1, offset_size, length_size)?;

        Ok(ObjectHeader {
            version: 1,
            messages,
            flags: 0,
            reference_count: Some(reference_count),
            times: None,
        })
    }

    fn parse_v2(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 6)?;
        let version = data[offset + 4];
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = data[offset + 5];
        let mut pos = offset + 6;

        let times = if flags & OH_FLAG_TIMES != 0 {
            ensure_len(data, pos, 16)?;
            let mut t = [0u32; 4];
            LittleEndian::read_u32_into(&data[pos..pos + 16], &mut t);
            pos += 16;
            Some(t)
        } else {
            None
        };
        if flags & OH_FLAG_ATTR_PHASE != 0 {
            pos += 4;
        }

        let width = 1u8 << (flags & 0x03);
        let chunk0_size = read_sized(data, pos, width)? as usize;
        pos += width as usize;

        let end = pos.checked_add(chunk0_size).ok_or(FormatError::UnexpectedEof {
            expected: usize::MAX,
            available: data.len(),
        })?;
        verify_checksum(data, offset, end)?;

        let mut chunks = Vec::new();
        chunks.push((pos, chunk0_size));
        let encoding = Encoding::V2 {
            creation_order: flags & OH_FLAG_CREATION_ORDER != 0,
        };
        let messages = walk_chunks(data, chunks, encoding, offset_size, length_size)?;

        Ok(ObjectHeader {
            version: 2,
            messages,
            flags,
            reference_count: None,
            times,
        })
    }
}

/// Check the lookup3 checksum stored at `end` against `data[start..end]`.
fn verify_checksum(data: &[u8], start: usize, end: usize) -> Result<(), FormatError> {
    ensure_len(data, end, 4)?;
    let stored = LittleEndian::read_u32(&data[end..end + 4]);
    let computed = jenkins_lookup3(&data[start..end]);
    if stored != computed {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}

/// Continuation chains longer than this are treated as cycles.
const MAX_CHUNKS: usize = 1024;

/// Decode messages from a queue of `(start, len)` chunks, appending any
/// continuation targets to the queue as they are found.
fn walk_chunks(
    data: &[u8],
    mut queue: Vec<(usize, usize)>,
    encoding: Encoding,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<HeaderMessage>, FormatError> {
    let header_len = encoding.message_header_len();
    let mut messages = Vec::new();
    let mut next = 0;

    while next < queue.len() {
        let (start, len) = queue[next];
        next += 1;
        ensure_len(data, start, len)?;
        let end = start + len;
        let mut pos = start;

        while pos + header_len <= end {
            let (raw_type, size, flags, creation_order) = match encoding {
                Encoding::V1 => (
                    LittleEndian::read_u16(&data[pos..pos + 2]),
                    LittleEndian::read_u16(&data[pos + 2..pos + 4]) as usize,
                    data[pos + 4],
                    None,
                ),
                Encoding::V2 { creation_order } => (
                    data[pos] as u16,
                    LittleEndian::read_u16(&data[pos + 1..pos + 3]) as usize,
                    data[pos + 3],
                    creation_order.then(|| LittleEndian::read_u16(&data[pos + 4..pos + 6])),
                ),
            };
            pos += header_len;
            if pos + size > end {
                // trailing gap too small to hold another message
                break;
            }
            let body = &data[pos..pos + size];
            pos += size;

            match MessageType::from_u16(raw_type) {
                MessageType::Nil => {}
                MessageType::ObjectHeaderContinuation => {
                    let os = offset_size as usize;
                    let target = read_sized(body, 0, offset_size)? as usize;
                    let target_len = read_sized(body, os, length_size)? as usize;
                    if queue.len() >= MAX_CHUNKS {
                        return Err(FormatError::UnsupportedStorage("object header continuation loop"));
                    }
                    queue.push(continuation_body(data, target, target_len, encoding)?);
                }
                MessageType::Unknown(id) if flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                    return Err(FormatError::UnsupportedMessage(id));
                }
                msg_type => messages.push(HeaderMessage {
                    msg_type,
                    flags,
                    creation_order,
                    data: body.to_vec(),
                }),
            }
        }
    }

    Ok(messages)
}

/// Translate a continuation target into the message region inside it.
fn continuation_body(
    data: &[u8],
    start: usize,
    len: usize,
    encoding: Encoding,
) -> Result<(usize, usize), FormatError> {
    match encoding {
        Encoding::V1 => Ok((start, len)),
        Encoding::V2 { .. } => {
            ensure_len(data, start, len)?;
            if len < 8 || data[start..start + 4] != OCHK_SIGNATURE {
                return Err(FormatError::InvalidObjectHeaderVersion(0));
            }
            let end = start + len - 4;
            verify_checksum(data, start, end)?;
            Ok((start + 4, len - 8))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_header_writer::ObjectHeaderWriter;

    fn v1_header(messages: &[(u16, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (ty, payload) in messages {
            let padded = (payload.len() + 7) & !7;
            body.extend_from_slice(&ty.to_le_bytes());
            body.extend_from_slice(&(padded as u16).to_le_bytes());
            body.extend_from_slice(&[0, 0, 0, 0]);
            body.extend_from_slice(payload);
            body.resize(body.len() + padded - payload.len(), 0);
        }
        let mut buf = vec![1, 0];
        buf.extend_from_slice(&(messages.len() as u16).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&body);
        buf
    }

    #[test]
    fn v1_messages_and_nil_padding() {
        let buf = v1_header(&[(0x0001, &[1, 2, 3]), (0x0000, &[]), (0x0011, &[9; 16])]);
        let oh = ObjectHeader::parse(&buf, 0, 8, 8).unwrap();
        assert_eq!(oh.version, 1);
        assert_eq!(oh.reference_count, Some(1));
        assert_eq!(oh.messages.len(), 2);
        assert_eq!(oh.messages[0].msg_type, MessageType::Dataspace);
        assert_eq!(&oh.messages[0].data[..3], &[1, 2, 3]);
        assert_eq!(oh.find(MessageType::SymbolTable).unwrap().data, vec![9; 16]);
    }

    #[test]
    fn v1_continuation_is_followed() {
        // continuation target goes right after the header
        let head_len = 16 + 8 + 16;
        let cont_target = head_len as u64;
        let mut cont_payload = cont_target.to_le_bytes().to_vec();
        cont_payload.extend_from_slice(&16u64.to_le_bytes());
        let mut buf = v1_header(&[(0x0010, &cont_payload)]);
        assert_eq!(buf.len(), head_len);
        // one message in the continuation block: 8-byte header + 8 bytes
        buf.extend_from_slice(&0x000Cu16.to_le_bytes());
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(b"attrdata");

        let oh = ObjectHeader::parse(&buf, 0, 8, 8).unwrap();
        assert_eq!(oh.messages.len(), 1);
        assert_eq!(oh.messages[0].msg_type, MessageType::Attribute);
        assert_eq!(oh.messages[0].data, b"attrdata".to_vec());
    }

    #[test]
    fn v2_written_header_parses_back() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Dataspace, vec![2, 1, 0, 0]);
        w.add_message_with_flags(MessageType::Attribute, 0x01, vec![7; 10]);
        let bytes = w.serialize();
        assert_eq!(&bytes[..4], b"OHDR");

        let oh = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert_eq!(oh.version, 2);
        assert_eq!(oh.messages.len(), 2);
        assert_eq!(oh.messages[1].flags, 0x01);
        assert_eq!(oh.messages[1].data, vec![7; 10]);
        assert_eq!(oh.times, None);
    }

    #[test]
    fn v2_checksum_is_verified() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Link, vec![1, 2, 3, 4]);
        let mut bytes = w.serialize();
        let n = bytes.len();
        bytes[n - 6] ^= 0xFF;
        assert!(matches!(
            ObjectHeader::parse(&bytes, 0, 8, 8),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn unknown_must_understand_message_fails() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message_with_flags(MessageType::Unknown(0x1F), MSG_FLAG_MUST_UNDERSTAND, vec![0]);
        let bytes = w.serialize();
        assert_eq!(
            ObjectHeader::parse(&bytes, 0, 8, 8),
            Err(FormatError::UnsupportedMessage(0x1F))
        );
    }

    #[test]
    fn unknown_optional_message_is_kept() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Unknown(0x1F), vec![5, 6]);
        let oh = ObjectHeader::parse(&w.serialize(), 0, 8, 8).unwrap();
        assert_eq!(oh.messages[0].msg_type, MessageType::Unknown(0x1F));
    }

    #[test]
    fn bad_v1_version() {
        let mut buf = v1_header(&[]);
        buf[0] = 3;
        assert_eq!(
            ObjectHeader::parse(&buf, 0, 8, 8),
            Err(FormatError::InvalidObjectHeaderVersion(3))
        );
    }
}
