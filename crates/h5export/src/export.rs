//! The export pipeline and its nine typed entry points.

use std::path::Path;

use crate::error::Result;
use crate::file::open_file;
use crate::library;
use crate::provision::provision_dataset;
use crate::write::{write_dataset, Element};

/// Write `data` as a dataset of shape `dims` at `data_path` inside the
/// container file at `file_path`.
///
/// The file is created if needed, missing groups along `data_path` are
/// created, and any dataset already at `data_path` is replaced. The
/// pipeline stops at the first failing stage; edits made by earlier stages
/// are still written out when the file handle is released.
///
/// ```no_run
/// h5export::export("out.h5", "/grid/values", &[1.5f64, 2.5, 3.5, 4.5], &[2, 2]).unwrap();
/// ```
pub fn export<T: Element>(
    file_path: impl AsRef<Path>,
    data_path: &str,
    data: &[T],
    dims: &[usize],
) -> Result<()> {
    library::initialize();
    let mut file = open_file(file_path)?;
    let ds = provision_dataset(&mut file, data_path, T::DISK, dims)?;
    write_dataset(&mut file, &ds, T::DISK, data)?;
    file.close()
}

macro_rules! export_fns {
    ($ty:ty, $vector:ident, $matrix:ident, $volume:ident) => {
        #[doc = concat!("Export a 1-D `", stringify!($ty), "` vector of length `dim1`.")]
        pub fn $vector(
            file_path: impl AsRef<Path>,
            data_path: &str,
            data: &[$ty],
            dim1: usize,
        ) -> Result<()> {
            export(file_path, data_path, data, &[dim1])
        }

        #[doc = concat!("Export a 2-D `", stringify!($ty), "` matrix, row-major.")]
        pub fn $matrix(
            file_path: impl AsRef<Path>,
            data_path: &str,
            data: &[$ty],
            dim1: usize,
            dim2: usize,
        ) -> Result<()> {
            export(file_path, data_path, data, &[dim1, dim2])
        }

        #[doc = concat!("Export a 3-D `", stringify!($ty), "` volume, row-major.")]
        pub fn $volume(
            file_path: impl AsRef<Path>,
            data_path: &str,
            data: &[$ty],
            dim1: usize,
            dim2: usize,
            dim3: usize,
        ) -> Result<()> {
            export(file_path, data_path, data, &[dim1, dim2, dim3])
        }
    };
}

export_fns!(i32, export_vector_i32, export_matrix_i32, export_volume_i32);
export_fns!(f32, export_vector_f32, export_matrix_f32, export_volume_f32);
export_fns!(f64, export_vector_f64, export_matrix_f64, export_volume_f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use h5export_format::datatype::Datatype;
    use h5export_format::Container;

    fn reopen(path: &Path) -> Container {
        Container::from_bytes(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn vector_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.h5");
        export_vector_i32(&path, "/v", &[1, 2, 3], 3).unwrap();

        let c = reopen(&path);
        let view = c.dataset("/v").unwrap();
        assert_eq!(view.datatype, Datatype::i32_le());
        assert_eq!(view.dataspace.dimensions, vec![3]);
        let le: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(view.data, Some(&le[..]));
    }

    #[test]
    fn failure_reports_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.h5");
        let err = export_matrix_f32(&path, "/m", &[0.0; 4], 2, 0).unwrap_err();
        assert_eq!(err.stage, Stage::Shape);
        let err = export_volume_f64(&path, "/m", &[0.0; 4], 2, 2, 2).unwrap_err();
        assert_eq!(err.stage, Stage::Write);
    }
}
