//! Export in-memory numeric arrays into HDF5 files.
//!
//! Each export opens (or creates) a container file, replaces whatever sits
//! at the dataset path with a fresh dataset of the requested shape, writes
//! the whole buffer and closes the file. Missing groups along the path are
//! created on the way.
//!
//! ```no_run
//! use h5export::{export_matrix_f64, export_vector_i32};
//!
//! export_vector_i32("run.h5", "/counts", &[1, 2, 3], 3).unwrap();
//! export_matrix_f64("run.h5", "/fields/temperature", &[1.5, 2.5, 3.5, 4.5], 2, 2).unwrap();
//! ```
//!
//! Datasets are stored little-endian (`i32`, IEEE `f32`, IEEE `f64`) with
//! contiguous layout. The same nine entry points are exported for C callers
//! as `h5_export_*` (see [`ffi`]).

pub mod error;
pub mod export;
pub mod ffi;
pub mod file;
pub mod library;
pub mod path;
pub mod provision;
pub mod types;
pub mod write;

pub use error::{Cause, ExportError, Stage};
pub use export::{
    export, export_matrix_f32, export_matrix_f64, export_matrix_i32, export_vector_f32,
    export_vector_f64, export_vector_i32, export_volume_f32, export_volume_f64,
    export_volume_i32,
};
pub use file::{open_file, ContainerFile, OpenMode};
pub use library::{initialize, shutdown};
pub use path::path_exists;
pub use provision::{provision_dataset, Shape};
pub use types::{lookup_native_type, TypeTag};
pub use write::{write_dataset, Element};

/// The container layer, for reading exported files back.
pub use h5export_format as format;
