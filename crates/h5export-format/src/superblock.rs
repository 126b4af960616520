//! HDF5 superblock: parsing for versions 0 through 3, serialization for 2 and 3.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::signature::HDF5_SIGNATURE;
use crate::util::{ensure_len, read_sized, validate_sizes, write_sized, UNDEFINED_ADDRESS};

/// Parsed HDF5 superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Superblock version (0-3).
    pub version: u8,
    /// Size of offsets in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (2, 4, or 8).
    pub length_size: u8,
    /// File base address. Stored addresses are relative to it.
    pub base_address: u64,
    /// End-of-file address.
    pub eof_address: u64,
    /// Root group object header address.
    pub root_group_address: u64,
    /// File consistency flags.
    pub consistency_flags: u32,
    /// Superblock extension address (v2/v3 only); `None` when undefined.
    pub superblock_extension_address: Option<u64>,
}

impl Superblock {
    /// A v3 superblock with 8-byte offsets and lengths, as written by
    /// [`crate::file_writer`].
    pub fn v3(eof_address: u64, root_group_address: u64) -> Self {
        Self {
            version: 3,
            offset_size: 8,
            length_size: 8,
            base_address: 0,
            eof_address,
            root_group_address,
            consistency_flags: 0,
            superblock_extension_address: None,
        }
    }

    /// Encoded size of a v2/v3 superblock with the given offset width.
    pub fn v2_encoded_size(offset_size: u8) -> usize {
        12 + 4 * offset_size as usize + 4
    }

    /// Parse a superblock from `data` starting at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, signature_offset, 9)?;
        let d = &data[signature_offset..];
        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }

        match d[8] {
            v @ (0 | 1) => Self::parse_v0v1(d, v),
            v @ (2 | 3) => Self::parse_v2v3(d, v),
            v => Err(FormatError::UnsupportedVersion(v)),
        }
    }

    fn parse_v0v1(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        // sig(8) + versions/reserved(5) + offset_size(1) + length_size(1)
        // + reserved(1) + leaf_k(2) + internal_k(2) + consistency_flags(4)
        // [+ istore_k(2) + reserved(2) in v1]
        let fixed = if version == 0 { 24 } else { 28 };
        ensure_len(d, 0, fixed)?;

        let offset_size = d[13];
        let length_size = d[14];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = LittleEndian::read_u32(&d[20..24]);

        let os = offset_size as usize;
        // base, free-space, eof, driver-info, then the root symbol table entry:
        // link_name_offset(os) + object_header_address(os) + cache(4) + reserved(4) + scratch(16)
        ensure_len(d, fixed, 4 * os + 2 * os + 24)?;
        let mut pos = fixed;
        let base_address = read_sized(d, pos, offset_size)?;
        pos += 2 * os;
        let eof_address = read_sized(d, pos, offset_size)?;
        pos += 2 * os;
        let root_group_address = read_sized(d, pos + os, offset_size)?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            consistency_flags,
            superblock_extension_address: None,
        })
    }

    fn parse_v2v3(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        ensure_len(d, 0, 12)?;
        let offset_size = d[9];
        let length_size = d[10];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = d[11] as u32;

        let os = offset_size as usize;
        let checksum_pos = 12 + 4 * os;
        ensure_len(d, checksum_pos, 4)?;

        let stored = LittleEndian::read_u32(&d[checksum_pos..checksum_pos + 4]);
        let computed = jenkins_lookup3(&d[..checksum_pos]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        let base_address = read_sized(d, 12, offset_size)?;
        let extension = read_sized(d, 12 + os, offset_size)?;
        let eof_address = read_sized(d, 12 + 2 * os, offset_size)?;
        let root_group_address = read_sized(d, 12 + 3 * os, offset_size)?;
        let undefined = UNDEFINED_ADDRESS >> (64 - 8 * os as u32);

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            consistency_flags,
            superblock_extension_address: (extension != undefined).then_some(extension),
        })
    }

    /// Serialize as a v2/v3 superblock with its trailing checksum.
    ///
    /// Versions 0 and 1 are read-only here; asking for them is an error.
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        if !matches!(self.version, 2 | 3) {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        validate_sizes(self.offset_size, self.length_size)?;

        let os = self.offset_size;
        let mut buf = Vec::with_capacity(Self::v2_encoded_size(os));
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(self.version);
        buf.push(os);
        buf.push(self.length_size);
        buf.push(self.consistency_flags as u8);
        write_sized(&mut buf, self.base_address, os);
        write_sized(
            &mut buf,
            self.superblock_extension_address.unwrap_or(UNDEFINED_ADDRESS),
            os,
        );
        write_sized(&mut buf, self.eof_address, os);
        write_sized(&mut buf, self.root_group_address, os);
        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }
}
