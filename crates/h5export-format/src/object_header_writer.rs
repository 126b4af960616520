//! v2 object header encoder.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::checksum::jenkins_lookup3;
use crate::message_type::MessageType;
use crate::object_header::{HeaderMessage, OHDR_SIGNATURE};

/// Builds a single-chunk v2 object header.
///
/// Creation order is never tracked and no timestamps are stored, so each
/// message costs 4 bytes of framing.
#[derive(Debug, Default)]
pub struct ObjectHeaderWriter {
    messages: Vec<(MessageType, u8, Vec<u8>)>,
}

impl ObjectHeaderWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) {
        self.add_message_with_flags(msg_type, 0, data);
    }

    pub fn add_message_with_flags(&mut self, msg_type: MessageType, flags: u8, data: Vec<u8>) {
        self.messages.push((msg_type, flags, data));
    }

    /// Re-emit a message read from another header, keeping its flags.
    pub fn push(&mut self, msg: &HeaderMessage) {
        self.add_message_with_flags(msg.msg_type, msg.flags, msg.data.clone());
    }

    fn chunk_len(&self) -> usize {
        self.messages.iter().map(|(_, _, d)| 4 + d.len()).sum()
    }

    /// Width code (header flag bits 0-1) and byte width of the chunk size field.
    fn size_field(chunk_len: usize) -> (u8, usize) {
        match chunk_len {
            0..=0xFF => (0, 1),
            0x100..=0xFFFF => (1, 2),
            _ => (2, 4),
        }
    }

    /// Number of bytes [`serialize`](Self::serialize) will produce.
    pub fn encoded_len(&self) -> usize {
        let chunk = self.chunk_len();
        // signature, version, flags, size field, messages, checksum
        4 + 1 + 1 + Self::size_field(chunk).1 + chunk + 4
    }

    pub fn serialize(&self) -> Vec<u8> {
        let chunk = self.chunk_len();
        let (code, width) = Self::size_field(chunk);

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&OHDR_SIGNATURE);
        buf.push(2);
        buf.push(code);
        buf.extend_from_slice(&(chunk as u32).to_le_bytes()[..width]);

        for (msg_type, flags, data) in &self.messages {
            buf.push(msg_type.to_u16() as u8);
            buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
            buf.push(*flags);
            buf.extend_from_slice(data);
        }

        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}
