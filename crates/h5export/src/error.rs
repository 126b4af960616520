//! Error types for the export pipeline.

use std::fmt;
use std::io;

use h5export_format::FormatError;

/// The pipeline step an export failed in.
///
/// Discriminants double as the (negated) status code returned across the
/// C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// A raw argument (null pointer, non-UTF-8 string) was rejected.
    Argument = 1,
    /// Opening an existing container file.
    Open = 2,
    /// Creating a new container file.
    Create = 3,
    /// Checking the dataset path for existence.
    PathCheck = 4,
    /// Deleting the dataset previously at the path.
    Delete = 5,
    /// Building the shape descriptor.
    Shape = 6,
    /// Creating the dataset and any missing groups on its path.
    CreateDataset = 7,
    /// Transferring the buffer into the dataset.
    Write = 8,
    /// Flushing the container back to disk.
    Close = 9,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Argument => "argument check",
            Stage::Open => "open",
            Stage::Create => "create",
            Stage::PathCheck => "path check",
            Stage::Delete => "delete",
            Stage::Shape => "shape",
            Stage::CreateDataset => "dataset creation",
            Stage::Write => "write",
            Stage::Close => "close",
        };
        f.write_str(name)
    }
}

/// What went wrong underneath a failing stage.
#[derive(Debug, thiserror::Error)]
pub enum Cause {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HDF5 format error: {0}")]
    Format(#[from] FormatError),

    #[error("rank {0} is outside 1..=3")]
    InvalidRank(usize),

    #[error("dimension {index} has zero length")]
    ZeroDimension { index: usize },

    #[error("dimension {index} has negative length {len}")]
    NegativeDimension { index: usize, len: i64 },

    #[error("shape holds more elements than fit in memory")]
    ShapeOverflow,

    #[error("{0} is a null pointer")]
    NullPointer(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// An export failure: the stage, the file or link path it concerned, and
/// the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed for \"{path}\": {source}")]
pub struct ExportError {
    pub stage: Stage,
    pub path: String,
    #[source]
    pub source: Cause,
}

impl ExportError {
    pub fn new(stage: Stage, path: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self {
            stage,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Negative status code identifying the failing stage.
    pub fn status(&self) -> i32 {
        -(self.stage as i32)
    }

    /// The container-layer error behind this failure, if there is one.
    pub fn format_error(&self) -> Option<&FormatError> {
        match &self.source {
            Cause::Format(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
