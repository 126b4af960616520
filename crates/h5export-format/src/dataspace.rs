//! Dataspace messages (type 0x0001).

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::FormatError;
use crate::util::{ensure_len, read_sized, write_sized};

/// Largest rank a simple dataspace may have.
pub const MAX_RANK: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    Scalar,
    Simple,
    Null,
}

/// Extent of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    pub space_type: DataspaceType,
    /// Current size of each dimension; empty unless `Simple`.
    pub dimensions: Vec<u64>,
    /// Maximum sizes, when stored. `u64::MAX` is unlimited.
    pub max_dimensions: Option<Vec<u64>>,
}

impl Dataspace {
    /// A fixed-size simple dataspace whose maximum extent equals `dims`.
    ///
    /// Rank must be in `1..=MAX_RANK` and every dimension non-zero.
    pub fn simple(dims: &[u64]) -> Result<Dataspace, FormatError> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(FormatError::InvalidRank(dims.len()));
        }
        if let Some(index) = dims.iter().position(|&d| d == 0) {
            return Err(FormatError::ZeroDimension { index });
        }
        Ok(Dataspace {
            space_type: DataspaceType::Simple,
            dimensions: dims.to_vec(),
            max_dimensions: None,
        })
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Element count: 1 for scalar, 0 for null.
    pub fn num_elements(&self) -> u64 {
        match self.space_type {
            DataspaceType::Null => 0,
            DataspaceType::Scalar => 1,
            DataspaceType::Simple => self.dimensions.iter().product(),
        }
    }

    /// Bytes needed to hold every element at `element_size`, or `None` on overflow.
    pub fn byte_len(&self, element_size: u32) -> Option<u64> {
        self.dimensions
            .iter()
            .try_fold(element_size as u64, |acc, &d| acc.checked_mul(d))
            .map(|n| if self.space_type == DataspaceType::Null { 0 } else { n })
    }

    /// Parse a version 1 or 2 dataspace message.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;
        let version = data[0];
        let rank = data[1] as usize;
        let flags = data[2];

        let (space_type, mut pos) = match version {
            1 => {
                let t = if rank == 0 {
                    DataspaceType::Scalar
                } else {
                    DataspaceType::Simple
                };
                (t, 8)
            }
            2 => {
                let t = match data[3] {
                    0 => DataspaceType::Scalar,
                    1 => DataspaceType::Simple,
                    2 => DataspaceType::Null,
                    other => return Err(FormatError::InvalidDataspaceType(other)),
                };
                (t, 4)
            }
            other => return Err(FormatError::InvalidDataspaceVersion(other)),
        };

        let mut read_dims = |count: usize| -> Result<Vec<u64>, FormatError> {
            let mut dims = Vec::with_capacity(count);
            for _ in 0..count {
                dims.push(read_sized(data, pos, length_size)?);
                pos += length_size as usize;
            }
            Ok(dims)
        };
        let dimensions = read_dims(rank)?;
        let max_dimensions = if flags & 0x01 != 0 {
            Some(read_dims(rank)?)
        } else {
            None
        };

        Ok(Dataspace {
            space_type,
            dimensions,
            max_dimensions,
        })
    }

    /// Encode as a version 2 message.
    pub fn serialize(&self, length_size: u8) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 2 * self.rank() * length_size as usize);
        buf.push(2);
        buf.push(self.rank() as u8);
        buf.push(self.max_dimensions.is_some() as u8);
        buf.push(match self.space_type {
            DataspaceType::Scalar => 0,
            DataspaceType::Simple => 1,
            DataspaceType::Null => 2,
        });
        let max = self.max_dimensions.iter().flatten();
        for &d in self.dimensions.iter().chain(max) {
            write_sized(&mut buf, d, length_size);
        }
        buf
    }
}
