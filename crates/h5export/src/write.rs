//! Whole-dataset transfer of typed buffers.

use h5export_format::DatasetRef;

use crate::error::{ExportError, Result, Stage};
use crate::file::ContainerFile;
use crate::types::{lookup_native_type, TypeTag};

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// An element type the export entry points accept.
pub trait Element: bytemuck::Pod + sealed::Sealed {
    /// How the element is stored on disk.
    const DISK: TypeTag;
}

impl Element for i32 {
    const DISK: TypeTag = TypeTag::StdI32Le;
}

impl Element for f32 {
    const DISK: TypeTag = TypeTag::IeeeF32Le;
}

impl Element for f64 {
    const DISK: TypeTag = TypeTag::IeeeF64Le;
}

/// Write all of `data` into `ds`, which was provisioned with element type
/// `disk`.
///
/// Elements are transferred as the native type `disk` maps to and
/// converted to the on-disk byte order. A buffer whose length does not
/// match the dataset is rejected.
pub fn write_dataset<T: Element>(
    file: &mut ContainerFile,
    ds: &DatasetRef,
    disk: TypeTag,
    data: &[T],
) -> Result<()> {
    let native = lookup_native_type(disk);
    let bytes: &[u8] = bytemuck::cast_slice(data);
    file.container_mut()
        .write(ds, &native.to_datatype(), bytes)
        .map_err(|e| {
            log::error!("Failed to write {} elements to \"{}\" ({e})", data.len(), ds.path());
            ExportError::new(Stage::Write, ds.path(), e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::open_file;
    use crate::provision::provision_dataset;
    use h5export_format::FormatError;

    #[test]
    fn writes_little_endian_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = open_file(dir.path().join("w.h5")).unwrap();
        let ds = provision_dataset(&mut file, "/x", f32::DISK, &[3]).unwrap();
        write_dataset(&mut file, &ds, f32::DISK, &[1.0f32, -2.0, 0.5]).unwrap();

        let expected: Vec<u8> = [1.0f32, -2.0, 0.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(file.container().dataset("/x").unwrap().data, Some(&expected[..]));
    }

    #[test]
    fn big_endian_dataset_is_swapped() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = open_file(dir.path().join("be.h5")).unwrap();
        let ds = provision_dataset(&mut file, "/be", TypeTag::StdI32Be, &[2]).unwrap();
        write_dataset(&mut file, &ds, TypeTag::StdI32Be, &[1i32, 256]).unwrap();
        assert_eq!(
            file.container().dataset("/be").unwrap().data,
            Some(&[0, 0, 0, 1, 0, 0, 1, 0][..])
        );
    }

    #[test]
    fn length_mismatch_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = open_file(dir.path().join("short.h5")).unwrap();
        let ds = provision_dataset(&mut file, "/v", i32::DISK, &[4]).unwrap();
        let err = write_dataset(&mut file, &ds, i32::DISK, &[1i32, 2]).unwrap_err();
        assert_eq!(err.stage, Stage::Write);
        assert_eq!(
            err.format_error(),
            Some(&FormatError::DataSizeMismatch { expected: 16, actual: 8 })
        );
    }

    #[test]
    fn disk_tags() {
        assert_eq!(i32::DISK, TypeTag::StdI32Le);
        assert_eq!(f32::DISK, TypeTag::IeeeF32Le);
        assert_eq!(f64::DISK, TypeTag::IeeeF64Le);
    }
}
