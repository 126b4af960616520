//! In-memory HDF5 object tree with link-level editing.
//!
//! A [`Container`] is what a file looks like after
//! [`file_reader`](crate::file_reader) has walked it: a root [`Group`] of
//! named [`Node`]s. Link operations mirror the container library calls an
//! exporter needs; [`Container::to_bytes`] lays the tree out as a fresh file.

#[cfg(not(feature = "std"))]
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec,
    vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::link_message::LinkTarget;
use crate::message_type::MessageType;
use crate::object_header::HeaderMessage;
use crate::property_list::{FileCreateProps, LinkCreateProps};

/// Fill value message v3: allocation time late, write time if-defined,
/// no value defined.
const DEFAULT_FILL_VALUE: [u8; 2] = [3, 0x0a];
/// Message flag: content never changes.
const MSG_FLAG_CONSTANT: u8 = 0x01;

/// A group and its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub members: BTreeMap<String, Node>,
    /// Header messages other than link bookkeeping (attributes, times, ...),
    /// re-emitted verbatim on write.
    pub messages: Vec<HeaderMessage>,
}

/// Raw data storage of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Compact(Vec<u8>),
    /// `data` is `None` while no storage is allocated; `size` is the
    /// extent in bytes either way.
    Contiguous { data: Option<Vec<u8>>, size: u64 },
}

impl Storage {
    pub fn size(&self) -> u64 {
        match self {
            Storage::Compact(raw) => raw.len() as u64,
            Storage::Contiguous { size, .. } => *size,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Storage::Compact(raw) => Some(raw),
            Storage::Contiguous { data, .. } => data.as_deref(),
        }
    }

    /// The layout message describing this storage at `address`.
    pub(crate) fn layout(&self, address: Option<u64>) -> DataLayout {
        match self {
            Storage::Compact(raw) => DataLayout::Compact(raw.clone()),
            Storage::Contiguous { data, size } => DataLayout::Contiguous {
                address: data.as_ref().and(address),
                size: *size,
            },
        }
    }
}

/// A dataset: every header message except its layout, plus its raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetNode {
    pub messages: Vec<HeaderMessage>,
    pub storage: Storage,
}

impl DatasetNode {
    fn message(&self, ty: MessageType) -> Result<&HeaderMessage, FormatError> {
        self.messages
            .iter()
            .find(|m| m.msg_type == ty)
            .ok_or(FormatError::UnsupportedMessage(ty.to_u16()))
    }

    /// The file datatype, when it is numeric.
    pub fn datatype(&self) -> Result<Datatype, FormatError> {
        Datatype::parse(&self.message(MessageType::Datatype)?.data)
    }

    pub fn dataspace(&self, length_size: u8) -> Result<Dataspace, FormatError> {
        Dataspace::parse(&self.message(MessageType::Dataspace)?.data, length_size)
    }
}

/// One entry in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Group(Group),
    Dataset(DatasetNode),
    /// A soft or user-defined link, kept as found.
    Link(LinkTarget),
    /// Any other object (a committed datatype, for instance), kept as its
    /// header messages.
    Opaque(Vec<HeaderMessage>),
}

/// Handle to a dataset created in a [`Container`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    components: Vec<String>,
}

impl DatasetRef {
    /// Absolute, normalized path of the dataset.
    pub fn path(&self) -> String {
        let mut p = String::new();
        for c in &self.components {
            p.push('/');
            p.push_str(c);
        }
        p
    }
}

/// Everything a reader needs to interpret one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetView<'a> {
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Stored file-order bytes; `None` when storage was never allocated.
    pub data: Option<&'a [u8]>,
}

/// An editable HDF5 file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub root: Group,
    /// Layout parameters used when serializing.
    pub props: FileCreateProps,
    /// Bytes that preceded the superblock in the source file.
    pub user_block: Vec<u8>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a link name into its components. Repeated and trailing
/// delimiters are ignored, so `"/a//b/"` names the same link as `"a/b"`.
fn components(path: &str) -> Result<Vec<&str>, FormatError> {
    if path.is_empty() {
        return Err(FormatError::EmptyPath);
    }
    Ok(path.split('/').filter(|c| !c.is_empty() && *c != ".").collect())
}

fn prefix(comps: &[&str]) -> String {
    let mut p = String::new();
    for c in comps {
        p.push('/');
        p.push_str(c);
    }
    p
}

impl Container {
    /// An empty file with default creation properties.
    pub fn new() -> Self {
        Self::with_props(FileCreateProps::default())
    }

    pub fn with_props(props: FileCreateProps) -> Self {
        Self {
            root: Group::default(),
            props,
            user_block: Vec::new(),
        }
    }

    /// Parse a complete file image.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        crate::file_reader::read(data)
    }

    /// Serialize the tree as a complete file image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        crate::file_writer::write(self)
    }

    /// Walk to the group holding the last component.
    fn parent(&self, comps: &[&str]) -> Result<&Group, FormatError> {
        let mut group = &self.root;
        for (i, comp) in comps.iter().enumerate().take(comps.len().saturating_sub(1)) {
            group = match group.members.get(*comp) {
                Some(Node::Group(g)) => g,
                Some(_) => return Err(FormatError::NotAGroup(prefix(&comps[..=i]))),
                None => return Err(FormatError::PathNotFound(prefix(&comps[..=i]))),
            };
        }
        Ok(group)
    }

    fn parent_mut(&mut self, comps: &[&str], create: bool) -> Result<&mut Group, FormatError> {
        let mut group = &mut self.root;
        for (i, comp) in comps.iter().enumerate().take(comps.len().saturating_sub(1)) {
            if create && !group.members.contains_key(*comp) {
                group
                    .members
                    .insert(comp.to_string(), Node::Group(Group::default()));
            }
            group = match group.members.get_mut(*comp) {
                Some(Node::Group(g)) => g,
                Some(_) => return Err(FormatError::NotAGroup(prefix(&comps[..=i]))),
                None => return Err(FormatError::PathNotFound(prefix(&comps[..=i]))),
            };
        }
        Ok(group)
    }

    /// Does a link with this name exist?
    ///
    /// Only the final component is looked up: every earlier component must
    /// already resolve to a group, otherwise the lookup itself fails. The
    /// root (`"/"`) always exists.
    pub fn link_exists(&self, path: &str) -> Result<bool, FormatError> {
        let comps = components(path)?;
        let Some(last) = comps.last() else {
            return Ok(true);
        };
        Ok(self.parent(&comps)?.members.contains_key(*last))
    }

    /// The node a path names, if any.
    pub fn get(&self, path: &str) -> Result<Option<&Node>, FormatError> {
        let comps = components(path)?;
        let Some(last) = comps.last() else {
            return Ok(None);
        };
        Ok(self.parent(&comps)?.members.get(*last))
    }

    /// Remove a link. Groups along the path are left in place.
    pub fn unlink(&mut self, path: &str) -> Result<(), FormatError> {
        let comps = components(path)?;
        let Some(last) = comps.last().copied() else {
            return Err(FormatError::EmptyPath);
        };
        self.parent_mut(&comps, false)?
            .members
            .remove(last)
            .map(|_| ())
            .ok_or_else(|| FormatError::PathNotFound(prefix(&comps)))
    }

    /// Create a dataset with unallocated contiguous storage.
    pub fn create_dataset(
        &mut self,
        path: &str,
        datatype: Datatype,
        space: &Dataspace,
        lcpl: &LinkCreateProps,
    ) -> Result<DatasetRef, FormatError> {
        let comps = components(path)?;
        let Some(last) = comps.last().copied() else {
            return Err(FormatError::AlreadyExists(String::from("/")));
        };
        let size = space
            .byte_len(datatype.type_size())
            .ok_or(FormatError::UnsupportedStorage("dataset larger than 2^64 bytes"))?;
        let length_size = self.props.length_size;

        let parent = self.parent_mut(&comps, lcpl.create_intermediate_groups)?;
        if parent.members.contains_key(last) {
            return Err(FormatError::AlreadyExists(prefix(&comps)));
        }

        let messages = vec![
            HeaderMessage {
                flags: MSG_FLAG_CONSTANT,
                ..HeaderMessage::new(MessageType::Datatype, datatype.serialize())
            },
            HeaderMessage::new(MessageType::Dataspace, space.serialize(length_size)),
            HeaderMessage {
                flags: MSG_FLAG_CONSTANT,
                ..HeaderMessage::new(MessageType::FillValue, DEFAULT_FILL_VALUE.to_vec())
            },
        ];
        parent.members.insert(
            last.to_string(),
            Node::Dataset(DatasetNode {
                messages,
                storage: Storage::Contiguous { data: None, size },
            }),
        );

        Ok(DatasetRef {
            components: comps.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn dataset_node_mut(&mut self, ds: &DatasetRef) -> Result<&mut DatasetNode, FormatError> {
        let comps: Vec<&str> = ds.components.iter().map(String::as_str).collect();
        let last = comps.last().copied().ok_or(FormatError::EmptyPath)?;
        match self.parent_mut(&comps, false)?.members.get_mut(last) {
            Some(Node::Dataset(node)) => Ok(node),
            Some(_) => Err(FormatError::NotADataset(ds.path())),
            None => Err(FormatError::PathNotFound(ds.path())),
        }
    }

    /// Replace the whole contents of a dataset.
    ///
    /// `buf` holds elements of `mem_type`; they are converted to the
    /// dataset's file datatype on the way in.
    pub fn write(&mut self, ds: &DatasetRef, mem_type: &Datatype, buf: &[u8]) -> Result<(), FormatError> {
        let node = self.dataset_node_mut(ds)?;
        let conversion = mem_type.conversion_to(&node.datatype()?)?;
        let expected = node.storage.size();
        if buf.len() as u64 != expected {
            return Err(FormatError::DataSizeMismatch {
                expected,
                actual: buf.len() as u64,
            });
        }
        let converted = conversion.apply(buf);
        node.storage = match node.storage {
            Storage::Compact(_) => Storage::Compact(converted),
            Storage::Contiguous { size, .. } => Storage::Contiguous {
                data: Some(converted),
                size,
            },
        };
        Ok(())
    }

    /// Look up a dataset with a numeric datatype.
    pub fn dataset(&self, path: &str) -> Result<DatasetView<'_>, FormatError> {
        match self.get(path)? {
            Some(Node::Dataset(node)) => Ok(DatasetView {
                datatype: node.datatype()?,
                dataspace: node.dataspace(self.props.length_size)?,
                data: node.storage.data(),
            }),
            Some(_) => Err(FormatError::NotADataset(path.to_string())),
            None => Err(FormatError::PathNotFound(path.to_string())),
        }
    }

    /// Names of a group's members, in sorted order.
    pub fn member_names(&self, path: &str) -> Result<Vec<&str>, FormatError> {
        let comps = components(path)?;
        let group = match comps.last() {
            None => &self.root,
            Some(last) => match self.parent(&comps)?.members.get(*last) {
                Some(Node::Group(g)) => g,
                Some(_) => return Err(FormatError::NotAGroup(prefix(&comps))),
                None => return Err(FormatError::PathNotFound(prefix(&comps))),
            },
        };
        Ok(group.members.keys().map(String::as_str).collect())
    }
}
