//! Symbol-table groups: the layout every file written before the 1.8
//! format changes uses for its groups.
//!
//! A symbol table message points at a local heap holding member names and
//! at a v1 B-tree whose leaves are symbol table nodes (`SNOD`). Reading
//! walks all three into a flat member list.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::util::{ensure_len, read_address, read_sized};

/// Symbol table message (type 0x0011).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolTableMessage {
    pub btree_address: u64,
    pub local_heap_address: u64,
}

impl SymbolTableMessage {
    pub fn parse(data: &[u8], offset_size: u8) -> Result<Self, FormatError> {
        Ok(Self {
            btree_address: read_sized(data, 0, offset_size)?,
            local_heap_address: read_sized(data, offset_size as usize, offset_size)?,
        })
    }
}

/// What a symbol table entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    Object(u64),
    /// Cache type 2: the scratch pad names a soft-link value in the heap.
    SoftLink(String),
}

/// A group member read from a symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub target: EntryTarget,
}

const CACHE_SOFT_LINK: u32 = 2;
/// Guard against cyclic or corrupt trees.
const MAX_BTREE_DEPTH: u8 = 64;

struct LocalHeap {
    segment_start: usize,
    segment_len: usize,
}

impl LocalHeap {
    fn parse(data: &[u8], at: usize, offset_size: u8, length_size: u8) -> Result<Self, FormatError> {
        ensure_len(data, at, 8)?;
        if &data[at..at + 4] != b"HEAP" {
            return Err(FormatError::InvalidLocalHeapSignature);
        }
        if data[at + 4] != 0 {
            return Err(FormatError::InvalidLocalHeapVersion(data[at + 4]));
        }
        let ls = length_size as usize;
        let segment_len = read_sized(data, at + 8, length_size)? as usize;
        let segment_start = read_sized(data, at + 8 + 2 * ls, offset_size)? as usize;
        ensure_len(data, segment_start, segment_len)?;
        Ok(Self {
            segment_start,
            segment_len,
        })
    }

    fn string_at(&self, data: &[u8], offset: u64) -> Result<String, FormatError> {
        let segment = &data[self.segment_start..self.segment_start + self.segment_len];
        let tail = segment.get(offset as usize..).unwrap_or(&[]);
        let len = tail.iter().position(|&b| b == 0).ok_or(FormatError::UnexpectedEof {
            expected: self.segment_start + offset as usize + 1,
            available: self.segment_start + self.segment_len,
        })?;
        Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
    }
}

/// Read every member of a symbol-table group.
pub fn read_group_entries(
    data: &[u8],
    table: &SymbolTableMessage,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<GroupEntry>, FormatError> {
    let heap = LocalHeap::parse(data, table.local_heap_address as usize, offset_size, length_size)?;

    let mut leaves = Vec::new();
    collect_leaves(data, table.btree_address, offset_size, MAX_BTREE_DEPTH, &mut leaves)?;

    let mut entries = Vec::new();
    for snod in leaves {
        read_symbol_node(data, snod as usize, offset_size, &heap, &mut entries)?;
    }
    Ok(entries)
}

/// Depth-first walk of a group B-tree, gathering SNOD addresses in key order.
fn collect_leaves(
    data: &[u8],
    node: u64,
    offset_size: u8,
    depth_left: u8,
    out: &mut Vec<u64>,
) -> Result<(), FormatError> {
    let at = node as usize;
    let os = offset_size as usize;
    ensure_len(data, at, 8 + 2 * os)?;
    if &data[at..at + 4] != b"TREE" {
        return Err(FormatError::InvalidBTreeSignature);
    }
    if data[at + 4] != 0 {
        return Err(FormatError::InvalidBTreeNodeType(data[at + 4]));
    }
    let level = data[at + 5];
    if level >= depth_left {
        return Err(FormatError::InvalidBTreeSignature);
    }
    let used = LittleEndian::read_u16(&data[at + 6..at + 8]) as usize;

    // siblings, then key[0] child[0] key[1] ... child[n-1] key[n]
    let mut pos = at + 8 + 2 * os + os;
    for _ in 0..used {
        let child = read_sized(data, pos, offset_size)?;
        if level == 0 {
            out.push(child);
        } else {
            collect_leaves(data, child, offset_size, depth_left - 1, out)?;
        }
        pos += 2 * os;
    }
    Ok(())
}

fn read_symbol_node(
    data: &[u8],
    at: usize,
    offset_size: u8,
    heap: &LocalHeap,
    out: &mut Vec<GroupEntry>,
) -> Result<(), FormatError> {
    ensure_len(data, at, 8)?;
    if &data[at..at + 4] != b"SNOD" {
        return Err(FormatError::InvalidSymbolTableNodeSignature);
    }
    if data[at + 4] != 1 {
        return Err(FormatError::InvalidSymbolTableNodeVersion(data[at + 4]));
    }
    let count = LittleEndian::read_u16(&data[at + 6..at + 8]) as usize;
    let os = offset_size as usize;
    let entry_len = 2 * os + 24;
    ensure_len(data, at + 8, count * entry_len)?;

    for i in 0..count {
        let e = at + 8 + i * entry_len;
        let name = heap.string_at(data, read_sized(data, e, offset_size)?)?;
        let cache_type = LittleEndian::read_u32(&data[e + 2 * os..e + 2 * os + 4]);
        let target = if cache_type == CACHE_SOFT_LINK {
            let scratch = e + 2 * os + 8;
            let value = LittleEndian::read_u32(&data[scratch..scratch + 4]) as u64;
            EntryTarget::SoftLink(heap.string_at(data, value)?)
        } else {
            match read_address(data, e + os, offset_size)? {
                Some(addr) => EntryTarget::Object(addr),
                None => continue,
            }
        };
        out.push(GroupEntry { name, target });
    }
    Ok(())
}
