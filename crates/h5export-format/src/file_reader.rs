//! Load a file image into a [`Container`].
//!
//! Every object reachable from the root group through hard links is read
//! into the tree. Header messages the tree does not model are kept raw so
//! they survive a rewrite; anything that holds file addresses the writer
//! could not update is refused.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::attribute::AttributeMessage;
use crate::container::{Container, DatasetNode, Group, Node, Storage};
use crate::data_layout::DataLayout;
use crate::datatype::refers_outside;
use crate::error::FormatError;
use crate::group_v1::{read_group_entries, EntryTarget, SymbolTableMessage};
use crate::link_message::{LinkInfo, LinkMessage, LinkTarget};
use crate::message_type::MessageType;
use crate::object_header::{HeaderMessage, ObjectHeader};
use crate::property_list::FileCreateProps;
use crate::signature::find_signature;
use crate::superblock::Superblock;
use crate::util::{ensure_len, read_address};

/// Deepest group nesting accepted.
const MAX_DEPTH: usize = 256;

struct Reader<'a> {
    /// The file from the superblock on; addresses are relative to it.
    data: &'a [u8],
    offset_size: u8,
    length_size: u8,
    /// Object header addresses of the groups being read, root first.
    ancestors: Vec<u64>,
}

/// Parse a complete file image.
pub fn read(file: &[u8]) -> Result<Container, FormatError> {
    let sb_offset = find_signature(file)?;
    let sb = Superblock::parse(file, sb_offset)?;

    let mut reader = Reader {
        data: &file[sb_offset..],
        offset_size: sb.offset_size,
        length_size: sb.length_size,
        ancestors: Vec::new(),
    };
    let root = match reader.read_object(sb.root_group_address)? {
        Node::Group(g) => g,
        _ => return Err(FormatError::NotAGroup(String::from("/"))),
    };

    Ok(Container {
        root,
        props: FileCreateProps::new().sizes(sb.offset_size, sb.length_size),
        user_block: file[..sb_offset].to_vec(),
    })
}

impl Reader<'_> {
    fn read_object(&mut self, address: u64) -> Result<Node, FormatError> {
        let oh = ObjectHeader::parse(self.data, address as usize, self.offset_size, self.length_size)?;
        if oh.messages.iter().any(|m| m.is_shared()) {
            return Err(FormatError::UnsupportedStorage("shared header message"));
        }

        for msg in &oh.messages {
            self.check_relocatable(msg)?;
        }

        let is_group = oh.messages.iter().any(|m| m.msg_type.is_group_structure());
        if is_group {
            if self.ancestors.contains(&address) {
                return Err(FormatError::UnsupportedStorage("hard link cycle"));
            }
            if self.ancestors.len() >= MAX_DEPTH {
                return Err(FormatError::UnsupportedStorage("group nesting this deep"));
            }
            self.ancestors.push(address);
            let group = self.read_group(oh);
            self.ancestors.pop();
            return group.map(Node::Group);
        }
        if oh.find(MessageType::DataLayout).is_some() {
            if let Some(dt) = oh.find(MessageType::Datatype) {
                if refers_outside(&dt.data)? {
                    return Err(FormatError::UnsupportedStorage(
                        "variable-length or reference dataset",
                    ));
                }
            }
            return self.read_dataset(oh).map(Node::Dataset);
        }
        Ok(Node::Opaque(oh.messages))
    }

    /// Refuse messages that hold file addresses the writer would not update.
    fn check_relocatable(&self, msg: &HeaderMessage) -> Result<(), FormatError> {
        match msg.msg_type {
            MessageType::ExternalDataFiles => {
                Err(FormatError::UnsupportedStorage("external data file list"))
            }
            MessageType::AttributeInfo => {
                if dense_attributes(&msg.data, self.offset_size)? {
                    return Err(FormatError::UnsupportedStorage("dense attribute storage"));
                }
                Ok(())
            }
            MessageType::Attribute => {
                let attr = AttributeMessage::parse(&msg.data)?;
                if attr.shared_datatype {
                    return Err(FormatError::UnsupportedStorage("committed attribute datatype"));
                }
                if refers_outside(attr.datatype)? {
                    return Err(FormatError::UnsupportedStorage(
                        "variable-length or reference attribute",
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn read_group(&mut self, oh: ObjectHeader) -> Result<Group, FormatError> {
        let mut group = Group::default();
        let mut links = Vec::new();

        for msg in &oh.messages {
            match msg.msg_type {
                MessageType::SymbolTable => {
                    let table = SymbolTableMessage::parse(&msg.data, self.offset_size)?;
                    for entry in read_group_entries(self.data, &table, self.offset_size, self.length_size)? {
                        let target = match entry.target {
                            EntryTarget::Object(addr) => LinkTarget::Hard(addr),
                            EntryTarget::SoftLink(path) => LinkTarget::Soft(path),
                        };
                        links.push((entry.name, target));
                    }
                }
                MessageType::LinkInfo => {
                    if LinkInfo::parse(&msg.data, self.offset_size)?.is_dense() {
                        return Err(FormatError::UnsupportedStorage("dense link storage"));
                    }
                }
                MessageType::Link => {
                    let link = LinkMessage::parse(&msg.data, self.offset_size)?;
                    links.push((link.name, link.target));
                }
                MessageType::GroupInfo => {}
                _ => group.messages.push(msg.clone()),
            }
        }

        for (name, target) in links {
            let node = match target {
                LinkTarget::Hard(addr) => self.read_object(addr)?,
                other => Node::Link(other),
            };
            group.members.insert(name, node);
        }
        Ok(group)
    }

    fn read_dataset(&self, oh: ObjectHeader) -> Result<DatasetNode, FormatError> {
        let mut storage = None;
        let mut messages = Vec::new();

        for msg in oh.messages {
            if msg.msg_type != MessageType::DataLayout {
                messages.push(msg);
                continue;
            }
            storage = Some(match DataLayout::parse(&msg.data, self.offset_size, self.length_size)? {
                DataLayout::Compact(raw) => Storage::Compact(raw),
                DataLayout::Contiguous { address, size } => {
                    let data = match address {
                        Some(addr) => {
                            let (start, len) = (addr as usize, size as usize);
                            ensure_len(self.data, start, len)?;
                            Some(self.data[start..start + len].to_vec())
                        }
                        None => None,
                    };
                    Storage::Contiguous { data, size }
                }
                DataLayout::Chunked => return Err(FormatError::UnsupportedStorage("chunked dataset")),
                DataLayout::Virtual => return Err(FormatError::UnsupportedStorage("virtual dataset")),
            });
        }

        let storage = storage.ok_or(FormatError::UnsupportedMessage(MessageType::DataLayout.to_u16()))?;
        Ok(DatasetNode { messages, storage })
    }
}

/// Whether an attribute info message points at a fractal heap. The heap
/// lives outside the object header, so a rewrite would leave it dangling.
fn dense_attributes(data: &[u8], offset_size: u8) -> Result<bool, FormatError> {
    ensure_len(data, 0, 2)?;
    let heap_at = if data[1] & 0x01 != 0 { 4 } else { 2 };
    Ok(read_address(data, heap_at, offset_size)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::fixture::{attribute_v1, attribute_v3};
    use crate::dataspace::Dataspace;
    use crate::datatype::fixture::{object_reference, vlen_string};
    use crate::datatype::Datatype;
    use crate::group_v1::fixture::{push_btree_with_snod, push_local_heap};
    use crate::object_header_writer::ObjectHeaderWriter;
    use crate::signature::HDF5_SIGNATURE;
    use crate::util::write_sized;

    /// v1 object header holding `messages`, each padded to 8 bytes.
    fn push_v1_header(buf: &mut Vec<u8>, messages: &[(u16, Vec<u8>)]) -> u64 {
        let at = buf.len() as u64;
        let mut body = Vec::new();
        for (ty, payload) in messages {
            let padded = (payload.len() + 7) & !7;
            body.extend_from_slice(&ty.to_le_bytes());
            body.extend_from_slice(&(padded as u16).to_le_bytes());
            body.extend_from_slice(&[0; 4]);
            body.extend_from_slice(payload);
            body.resize(body.len() + padded - payload.len(), 0);
        }
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(messages.len() as u16).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&body);
        at
    }

    fn symbol_table_msg(btree: u64, heap: u64) -> Vec<u8> {
        let mut m = btree.to_le_bytes().to_vec();
        m.extend_from_slice(&heap.to_le_bytes());
        m
    }

    /// A version 0 file the way older libraries wrote it: root group
    /// `{ temps: f64[3] dataset, sub: empty group, alias -> /temps }`.
    fn legacy_file() -> Vec<u8> {
        const SB_LEN: usize = 96;
        let mut buf = vec![0u8; SB_LEN];

        let raw: Vec<u8> = [1.0f64, 2.0, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let data_at = buf.len() as u64;
        buf.extend_from_slice(&raw);

        let mut layout = vec![3, 1];
        layout.extend_from_slice(&data_at.to_le_bytes());
        layout.extend_from_slice(&(raw.len() as u64).to_le_bytes());
        let mut space = vec![1, 1, 0, 0, 0, 0, 0, 0];
        space.extend_from_slice(&3u64.to_le_bytes());
        let units = attribute_v1("units", &Datatype::f64_le().serialize(), &2.5f64.to_le_bytes());
        let temps = push_v1_header(
            &mut buf,
            &[
                (0x0001, space),
                (0x0003, Datatype::f64_le().serialize()),
                (0x0008, layout),
                (0x000C, units),
            ],
        );

        let (sub_heap, _) = push_local_heap(&mut buf, &[]);
        let sub_tree = push_btree_with_snod(&mut buf, &[]);
        let sub = push_v1_header(&mut buf, &[(0x0011, symbol_table_msg(sub_tree, sub_heap))]);

        let (heap, offs) = push_local_heap(&mut buf, &["alias", "sub", "temps", "/temps"]);
        let tree = push_btree_with_snod(
            &mut buf,
            &[(offs[0], 0, Some(offs[3] as u32)), (offs[1], sub, None), (offs[2], temps, None)],
        );
        let root = push_v1_header(&mut buf, &[(0x0011, symbol_table_msg(tree, heap))]);

        let eof = buf.len() as u64;
        let mut sb = Vec::new();
        sb.extend_from_slice(&HDF5_SIGNATURE);
        sb.extend_from_slice(&[0, 0, 0, 0, 0, 8, 8, 0]);
        sb.extend_from_slice(&4u16.to_le_bytes());
        sb.extend_from_slice(&16u16.to_le_bytes());
        sb.extend_from_slice(&0u32.to_le_bytes());
        write_sized(&mut sb, 0, 8);
        write_sized(&mut sb, u64::MAX, 8);
        write_sized(&mut sb, eof, 8);
        write_sized(&mut sb, u64::MAX, 8);
        write_sized(&mut sb, 0, 8);
        write_sized(&mut sb, root, 8);
        sb.extend_from_slice(&[0; 24]);
        assert_eq!(sb.len(), SB_LEN);
        buf[..SB_LEN].copy_from_slice(&sb);
        buf
    }

    #[test]
    fn reads_symbol_table_file() {
        let c = read(&legacy_file()).unwrap();
        assert_eq!(c.member_names("/").unwrap(), vec!["alias", "sub", "temps"]);
        assert_eq!(c.get("/alias").unwrap(), Some(&Node::Link(LinkTarget::Soft("/temps".into()))));
        assert!(c.member_names("/sub").unwrap().is_empty());

        let view = c.dataset("/temps").unwrap();
        assert_eq!(view.datatype, Datatype::f64_le());
        assert_eq!(view.dataspace.dimensions, vec![3]);
        assert_eq!(&view.data.unwrap()[8..16], &2.0f64.to_le_bytes());

        match c.get("/temps").unwrap() {
            Some(Node::Dataset(ds)) => {
                assert!(ds.messages.iter().any(|m| m.msg_type == MessageType::Attribute));
                assert!(ds.messages.iter().all(|m| m.msg_type != MessageType::DataLayout));
            }
            other => panic!("expected dataset, got {other:?}"),
        }
    }

    #[test]
    fn sizes_come_from_the_superblock() {
        let c = read(&legacy_file()).unwrap();
        assert_eq!(c.props.offset_size, 8);
        assert_eq!(c.props.superblock_version, 3);
        assert!(c.user_block.is_empty());
    }

    #[test]
    fn chunked_dataset_is_refused() {
        let mut c = Container::new();
        let space = Dataspace::simple(&[4]).unwrap();
        let lcpl = Default::default();
        c.create_dataset("/d", Datatype::i32_le(), &space, &lcpl).unwrap();
        let mut bytes = c.to_bytes().unwrap();

        // rewrite the dataset's layout class to chunked and fix the checksum
        let oh_start = bytes.windows(4).rposition(|w| w == b"OHDR").unwrap();
        let layout_pos = bytes[oh_start..]
            .windows(2)
            .position(|w| w == [3, 1])
            .map(|p| oh_start + p)
            .unwrap();
        bytes[layout_pos + 1] = 2;
        let end = bytes.len() - 4;
        let sum = crate::checksum::jenkins_lookup3(&bytes[oh_start..end]);
        bytes[end..].copy_from_slice(&sum.to_le_bytes());

        assert_eq!(read(&bytes), Err(FormatError::UnsupportedStorage("chunked dataset")));
    }

    #[test]
    fn dense_groups_are_refused() {
        let dense = LinkInfo {
            max_creation_index: None,
            fractal_heap_address: Some(0x200),
            name_index_address: Some(0x300),
        };
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::LinkInfo, dense.serialize(8));
        let mut buf = vec![0u8; Superblock::v2_encoded_size(8)];
        buf.extend_from_slice(&w.serialize());
        let sb = Superblock::v3(buf.len() as u64, 48).serialize().unwrap();
        buf[..48].copy_from_slice(&sb);

        assert_eq!(read(&buf), Err(FormatError::UnsupportedStorage("dense link storage")));
    }

    #[test]
    fn dense_attributes_are_refused() {
        let mut info = vec![0, 0];
        info.extend_from_slice(&0x200u64.to_le_bytes());
        info.extend_from_slice(&0x300u64.to_le_bytes());
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::LinkInfo, LinkInfo::compact().serialize(8));
        w.add_message(MessageType::AttributeInfo, info);
        let mut buf = vec![0u8; Superblock::v2_encoded_size(8)];
        buf.extend_from_slice(&w.serialize());
        let sb = Superblock::v3(buf.len() as u64, 48).serialize().unwrap();
        buf[..48].copy_from_slice(&sb);

        assert_eq!(read(&buf), Err(FormatError::UnsupportedStorage("dense attribute storage")));
    }

    #[test]
    fn compact_attribute_info_is_kept() {
        let mut info = vec![0, 0];
        info.extend_from_slice(&u64::MAX.to_le_bytes());
        info.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(!dense_attributes(&info, 8).unwrap());
        assert!(dense_attributes(&[0, 0, 1], 8).is_err());
    }

    /// A version 3 file whose root group links `/d` to an object holding
    /// `messages`.
    fn file_with_object(messages: Vec<(MessageType, Vec<u8>)>) -> Vec<u8> {
        let mut buf = vec![0u8; Superblock::v2_encoded_size(8)];
        let mut obj = ObjectHeaderWriter::new();
        for (ty, data) in messages {
            obj.add_message(ty, data);
        }
        let obj_at = buf.len() as u64;
        buf.extend_from_slice(&obj.serialize());

        let mut root = ObjectHeaderWriter::new();
        root.add_message(MessageType::LinkInfo, LinkInfo::compact().serialize(8));
        root.add_message(MessageType::Link, LinkMessage::hard("d", obj_at).serialize(8));
        let root_at = buf.len() as u64;
        buf.extend_from_slice(&root.serialize());

        let sb = Superblock::v3(buf.len() as u64, root_at).serialize().unwrap();
        buf[..sb.len()].copy_from_slice(&sb);
        buf
    }

    /// Messages of an unwritten two-element dataset of type `datatype`.
    fn dataset_messages(datatype: Vec<u8>) -> Vec<(MessageType, Vec<u8>)> {
        let mut layout = vec![3, 1];
        layout.extend_from_slice(&u64::MAX.to_le_bytes());
        layout.extend_from_slice(&32u64.to_le_bytes());
        vec![
            (MessageType::Dataspace, Dataspace::simple(&[2]).unwrap().serialize(8)),
            (MessageType::Datatype, datatype),
            (MessageType::DataLayout, layout),
        ]
    }

    #[test]
    fn numeric_dataset_with_attribute_is_read() {
        let mut messages = dataset_messages(Datatype::i32_le().serialize());
        let attr = attribute_v3("scale", 0, &Datatype::f64_le().serialize(), &0.5f64.to_le_bytes());
        messages.push((MessageType::Attribute, attr));

        let c = read(&file_with_object(messages)).unwrap();
        let view = c.dataset("/d").unwrap();
        assert_eq!(view.datatype, Datatype::i32_le());
        assert_eq!(view.data, None);
    }

    #[test]
    fn vlen_string_dataset_is_refused() {
        let bytes = file_with_object(dataset_messages(vlen_string()));
        assert_eq!(
            read(&bytes),
            Err(FormatError::UnsupportedStorage("variable-length or reference dataset"))
        );
    }

    #[test]
    fn nested_reference_dataset_is_refused() {
        // compound { i32 id; object reference target }
        let mut dt = vec![0x36, 2, 0, 0, 12, 0, 0, 0];
        dt.extend_from_slice(b"id\0\0");
        dt.extend_from_slice(&Datatype::i32_le().serialize());
        dt.extend_from_slice(b"target\0\x04");
        dt.extend_from_slice(&object_reference());

        assert_eq!(
            read(&file_with_object(dataset_messages(dt))),
            Err(FormatError::UnsupportedStorage("variable-length or reference dataset"))
        );
    }

    #[test]
    fn vlen_attribute_on_group_is_refused() {
        let bytes = file_with_object(vec![
            (MessageType::LinkInfo, LinkInfo::compact().serialize(8)),
            (MessageType::Attribute, attribute_v3("names", 0, &vlen_string(), &[0; 16])),
        ]);
        assert_eq!(
            read(&bytes),
            Err(FormatError::UnsupportedStorage("variable-length or reference attribute"))
        );
    }

    #[test]
    fn reference_attribute_on_dataset_is_refused() {
        let mut messages = dataset_messages(Datatype::f32_le().serialize());
        let attr = attribute_v1("origin", &object_reference(), &[0; 8]);
        messages.push((MessageType::Attribute, attr));
        assert_eq!(
            read(&file_with_object(messages)),
            Err(FormatError::UnsupportedStorage("variable-length or reference attribute"))
        );
    }

    #[test]
    fn committed_attribute_datatype_is_refused() {
        let mut messages = dataset_messages(Datatype::f32_le().serialize());
        messages.push((MessageType::Attribute, attribute_v3("kind", 0x01, &[0; 10], &[0; 4])));
        assert_eq!(
            read(&file_with_object(messages)),
            Err(FormatError::UnsupportedStorage("committed attribute datatype"))
        );
    }

    #[test]
    fn external_data_files_are_refused() {
        let mut messages = dataset_messages(Datatype::f64_le().serialize());
        let mut efl = vec![1, 0, 0, 0, 1, 0, 1, 0];
        efl.extend_from_slice(&0x40u64.to_le_bytes());
        messages.push((MessageType::ExternalDataFiles, efl));
        assert_eq!(
            read(&file_with_object(messages)),
            Err(FormatError::UnsupportedStorage("external data file list"))
        );
    }

    #[test]
    fn missing_signature() {
        assert_eq!(read(&[0u8; 64]), Err(FormatError::SignatureNotFound));
    }
}
