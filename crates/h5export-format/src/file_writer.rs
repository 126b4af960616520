//! Serialize a [`Container`] into a file image.
//!
//! Layout: optional user block, v2/v3 superblock, one v2 object header per
//! object in pre-order, then every allocated contiguous data block. Groups
//! use compact link storage.
//!
//! Addresses are assigned in two passes. Header sizes never depend on the
//! addresses they contain, so the first pass encodes every header with
//! placeholder addresses to measure it and the second encodes it for real.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::container::{Container, DatasetNode, Group, Node, Storage};
use crate::error::FormatError;
use crate::link_message::{LinkInfo, LinkMessage, LinkTarget};
use crate::message_type::MessageType;
use crate::object_header::HeaderMessage;
use crate::object_header_writer::ObjectHeaderWriter;
use crate::property_list::FileCreateProps;
use crate::superblock::Superblock;

/// Group info message v0 with no stored hints.
const EMPTY_GROUP_INFO: [u8; 2] = [0, 0];

/// An object flattened out of the tree.
enum Object<'a> {
    Group {
        links: Vec<(&'a str, Child<'a>)>,
        messages: &'a [HeaderMessage],
    },
    Dataset(&'a DatasetNode),
    Opaque(&'a [HeaderMessage]),
}

enum Child<'a> {
    /// Index into the flattened object list.
    Object(usize),
    Link(&'a LinkTarget),
}

fn flatten<'a>(group: &'a Group, out: &mut Vec<Object<'a>>) -> usize {
    let index = out.len();
    out.push(Object::Group {
        links: Vec::new(),
        messages: &group.messages,
    });

    let mut links = Vec::with_capacity(group.members.len());
    for (name, node) in &group.members {
        let child = match node {
            Node::Group(g) => Child::Object(flatten(g, out)),
            Node::Dataset(ds) => {
                out.push(Object::Dataset(ds));
                Child::Object(out.len() - 1)
            }
            Node::Opaque(messages) => {
                out.push(Object::Opaque(messages));
                Child::Object(out.len() - 1)
            }
            Node::Link(target) => Child::Link(target),
        };
        links.push((name.as_str(), child));
    }
    if let Object::Group { links: slot, .. } = &mut out[index] {
        *slot = links;
    }
    index
}

struct Encoder<'a> {
    objects: Vec<Object<'a>>,
    props: &'a FileCreateProps,
}

impl Encoder<'_> {
    /// Encode object `i`. `headers` and `data` hold the addresses of every
    /// object header and data block (placeholders in the sizing pass).
    fn header(&self, i: usize, headers: &[u64], data: &[Option<u64>]) -> Result<ObjectHeaderWriter, FormatError> {
        let (os, ls) = (self.props.offset_size, self.props.length_size);
        let mut w = ObjectHeaderWriter::new();
        match &self.objects[i] {
            Object::Group { links, messages } => {
                w.add_message(MessageType::LinkInfo, LinkInfo::compact().serialize(os));
                w.add_message(MessageType::GroupInfo, EMPTY_GROUP_INFO.to_vec());
                for (name, child) in links {
                    let msg = match child {
                        Child::Object(j) => LinkMessage::hard(name, headers[*j]),
                        Child::Link(target) => LinkMessage {
                            target: (*target).clone(),
                            ..LinkMessage::hard(name, 0)
                        },
                    };
                    w.add_message(MessageType::Link, msg.serialize(os));
                }
                for m in messages.iter() {
                    w.push(m);
                }
            }
            Object::Dataset(ds) => {
                for m in &ds.messages {
                    w.push(m);
                }
                let layout = ds.storage.layout(data[i]);
                w.add_message(MessageType::DataLayout, layout.serialize(os, ls)?);
            }
            Object::Opaque(messages) => {
                for m in messages.iter() {
                    w.push(m);
                }
            }
        }
        Ok(w)
    }

    /// Bytes of the contiguous data block object `i` owns, if allocated.
    fn data_block(&self, i: usize) -> Option<&[u8]> {
        match &self.objects[i] {
            Object::Dataset(ds) => match &ds.storage {
                Storage::Contiguous { data, .. } => data.as_deref(),
                Storage::Compact(_) => None,
            },
            _ => None,
        }
    }
}

/// Serialize `container` with its own creation properties.
pub fn write(container: &Container) -> Result<Vec<u8>, FormatError> {
    let props = &container.props;
    let mut objects = Vec::new();
    flatten(&container.root, &mut objects);
    let enc = Encoder { objects, props };
    let n = enc.objects.len();

    // pass 1: measure every header with placeholder addresses
    let zero_headers = vec![0u64; n];
    let zero_data = vec![Some(0u64); n];
    let mut sizes = Vec::with_capacity(n);
    for i in 0..n {
        sizes.push(enc.header(i, &zero_headers, &zero_data)?.encoded_len() as u64);
    }

    // addresses, relative to the superblock
    let mut cursor = Superblock::v2_encoded_size(props.offset_size) as u64;
    let mut headers = Vec::with_capacity(n);
    for size in &sizes {
        headers.push(cursor);
        cursor += size;
    }
    let mut data = Vec::with_capacity(n);
    for i in 0..n {
        data.push(enc.data_block(i).map(|block| {
            let at = cursor;
            cursor += block.len() as u64;
            at
        }));
    }
    let eof = cursor;

    // pass 2: encode for real; addresses are relative to the superblock,
    // which sits right after the user block
    let sb = Superblock {
        version: props.superblock_version,
        offset_size: props.offset_size,
        length_size: props.length_size,
        base_address: container.user_block.len() as u64,
        eof_address: eof,
        root_group_address: headers[0],
        consistency_flags: 0,
        superblock_extension_address: None,
    };
    let mut buf = Vec::with_capacity(container.user_block.len() + eof as usize);
    buf.extend_from_slice(&container.user_block);
    buf.extend_from_slice(&sb.serialize()?);
    for i in 0..n {
        let encoded = enc.header(i, &headers, &data)?.serialize();
        debug_assert_eq!(encoded.len() as u64, sizes[i]);
        buf.extend_from_slice(&encoded);
    }
    for i in 0..n {
        if let Some(block) = enc.data_block(i) {
            buf.extend_from_slice(block);
        }
    }
    Ok(buf)
}
