//! Pure-Rust HDF5 container layer.
//!
//! This crate parses HDF5 files into an editable object tree
//! ([`container::Container`]), offers the link primitives an exporter needs
//! (existence checks, unlinking, dataset creation with intermediate groups,
//! whole-dataset writes) and serializes the tree back into a valid file.
//! It supports `no_std` environments with the `alloc` crate.
//!
//! # Example
//!
//! ```
//! use h5export_format::container::Container;
//! use h5export_format::dataspace::Dataspace;
//! use h5export_format::datatype::Datatype;
//! use h5export_format::property_list::LinkCreateProps;
//!
//! let mut c = Container::new();
//! let lcpl = LinkCreateProps::new().create_intermediate_groups(true);
//! let space = Dataspace::simple(&[3]).unwrap();
//! let ds = c.create_dataset("/grid/values", Datatype::i32_le(), &space, &lcpl).unwrap();
//! let raw: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
//! c.write(&ds, &Datatype::i32_le(), &raw).unwrap();
//! let bytes = c.to_bytes().unwrap();
//! assert!(Container::from_bytes(&bytes).unwrap().link_exists("/grid/values").unwrap());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod attribute;
pub mod checksum;
pub mod container;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file_reader;
pub mod file_writer;
pub mod group_v1;
pub mod link_message;
pub mod message_type;
pub mod object_header;
pub mod object_header_writer;
pub mod property_list;
pub mod signature;
pub mod superblock;
mod util;

pub use container::{Container, DatasetRef};
pub use error::FormatError;
