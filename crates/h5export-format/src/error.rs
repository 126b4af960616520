//! Error types for HDF5 container parsing and editing.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt;

/// Errors raised while parsing, editing or serializing an HDF5 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The HDF5 magic signature was not found at any valid offset.
    SignatureNotFound,
    /// The superblock version is not supported.
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header version.
    InvalidObjectHeaderVersion(u8),
    /// Unknown message type that is marked as must-understand.
    UnsupportedMessage(u16),
    /// Jenkins lookup3 checksum mismatch.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Invalid dataspace message version.
    InvalidDataspaceVersion(u8),
    /// Invalid dataspace type byte.
    InvalidDataspaceType(u8),
    /// Datatype class this layer cannot describe.
    UnsupportedDatatypeClass(u8),
    /// Invalid datatype message version for its class.
    InvalidDatatypeVersion {
        /// Datatype class.
        class: u8,
        /// Version found.
        version: u8,
    },
    /// Invalid attribute message version.
    InvalidAttributeVersion(u8),
    /// Invalid link message version.
    InvalidLinkVersion(u8),
    /// Invalid link type code.
    InvalidLinkType(u8),
    /// Invalid character set value.
    InvalidCharacterSet(u8),
    /// Invalid data layout message version.
    InvalidLayoutVersion(u8),
    /// Invalid data layout class.
    InvalidLayoutClass(u8),
    /// Invalid local heap signature.
    InvalidLocalHeapSignature,
    /// Invalid local heap version.
    InvalidLocalHeapVersion(u8),
    /// Invalid B-tree v1 node signature.
    InvalidBTreeSignature,
    /// B-tree v1 node is not a group node.
    InvalidBTreeNodeType(u8),
    /// Invalid symbol table node signature.
    InvalidSymbolTableNodeSignature,
    /// Invalid symbol table node version.
    InvalidSymbolTableNodeVersion(u8),
    /// A structure that cannot be relocated when the file is rewritten.
    UnsupportedStorage(&'static str),
    /// A link name was empty.
    EmptyPath,
    /// An intermediate path component does not exist.
    PathNotFound(String),
    /// A path component that must be a group is something else.
    NotAGroup(String),
    /// The object at the given path is not a dataset.
    NotADataset(String),
    /// A link with this name already exists.
    AlreadyExists(String),
    /// Dataspace rank outside `1..=MAX_RANK`.
    InvalidRank(usize),
    /// A dimension of a simple dataspace is zero.
    ZeroDimension {
        /// Index of the offending dimension.
        index: usize,
    },
    /// The buffer handed to a write does not match the dataset extent.
    DataSizeMismatch {
        /// Bytes the dataset holds.
        expected: u64,
        /// Bytes supplied.
        actual: u64,
    },
    /// Memory and file datatypes are not convertible.
    TypeMismatch,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any valid offset")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "invalid object header version: {v}")
            }
            FormatError::UnsupportedMessage(id) => {
                write!(
                    f,
                    "unsupported message type {id:#06x} marked as must-understand"
                )
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => write!(f, "invalid dataspace type: {t}"),
            FormatError::UnsupportedDatatypeClass(c) => {
                write!(f, "unsupported datatype class: {c}")
            }
            FormatError::InvalidDatatypeVersion { class, version } => {
                write!(f, "invalid version {version} for datatype class {class}")
            }
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute message version: {v}")
            }
            FormatError::InvalidLinkVersion(v) => write!(f, "invalid link message version: {v}"),
            FormatError::InvalidLinkType(t) => write!(f, "invalid link type: {t}"),
            FormatError::InvalidCharacterSet(c) => write!(f, "invalid character set: {c}"),
            FormatError::InvalidLayoutVersion(v) => write!(f, "invalid data layout version: {v}"),
            FormatError::InvalidLayoutClass(c) => write!(f, "invalid data layout class: {c}"),
            FormatError::InvalidLocalHeapSignature => write!(f, "invalid local heap signature"),
            FormatError::InvalidLocalHeapVersion(v) => {
                write!(f, "invalid local heap version: {v}")
            }
            FormatError::InvalidBTreeSignature => write!(f, "invalid B-tree v1 signature"),
            FormatError::InvalidBTreeNodeType(t) => {
                write!(f, "B-tree v1 node type {t} is not a group node")
            }
            FormatError::InvalidSymbolTableNodeSignature => {
                write!(f, "invalid symbol table node signature")
            }
            FormatError::InvalidSymbolTableNodeVersion(v) => {
                write!(f, "invalid symbol table node version: {v}")
            }
            FormatError::UnsupportedStorage(what) => {
                write!(f, "cannot relocate {what} when rewriting the file")
            }
            FormatError::EmptyPath => write!(f, "empty link name"),
            FormatError::PathNotFound(p) => write!(f, "path component not found: {p}"),
            FormatError::NotAGroup(p) => write!(f, "not a group: {p}"),
            FormatError::NotADataset(p) => write!(f, "not a dataset: {p}"),
            FormatError::AlreadyExists(p) => write!(f, "link already exists: {p}"),
            FormatError::InvalidRank(r) => {
                write!(
                    f,
                    "invalid dataspace rank {r} (must be 1..={})",
                    crate::dataspace::MAX_RANK
                )
            }
            FormatError::ZeroDimension { index } => {
                write!(f, "dimension {index} has zero length")
            }
            FormatError::DataSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "data size mismatch: dataset holds {expected} bytes, buffer has {actual}"
                )
            }
            FormatError::TypeMismatch => {
                write!(f, "memory datatype is not convertible to the file datatype")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
