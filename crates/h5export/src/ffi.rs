//! C ABI for the nine export entry points.
//!
//! Every function returns `0` on success and a negative status on failure
//! (see [`ExportError::status`]). Diagnostics go through the `log` facade.
//!
//! ```c
//! int h5_export_matrix_f64(const char *file_path, const char *data_path,
//!                          const double *data, int dim1_length, int dim2_length);
//! ```

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use crate::error::{Cause, ExportError, Result, Stage};
use crate::export::export;
use crate::write::Element;

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives
/// the returned borrow.
unsafe fn c_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(argument_error("", Cause::NullPointer(what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| argument_error("", Cause::InvalidUtf8(what)))
}

fn argument_error(path: &str, cause: Cause) -> ExportError {
    log::error!("Invalid argument for \"{path}\" ({cause})");
    ExportError::new(Stage::Argument, path, cause)
}

/// Convert C dimension lengths, rejecting negative ones. Zero lengths pass
/// through so the shape check reports them.
fn dims(data_path: &str, lengths: &[c_int]) -> Result<Vec<usize>> {
    lengths
        .iter()
        .enumerate()
        .map(|(index, &len)| {
            usize::try_from(len).map_err(|_| {
                let cause = Cause::NegativeDimension {
                    index,
                    len: len.into(),
                };
                log::error!("Invalid shape for \"{data_path}\" ({cause})");
                ExportError::new(Stage::Shape, data_path, cause)
            })
        })
        .collect()
}

/// # Safety
///
/// See the entry points: valid strings, and `data` pointing at as many
/// elements as the dimensions multiply to.
unsafe fn run<T: Element>(
    file_path: *const c_char,
    data_path: *const c_char,
    data: *const T,
    lengths: &[c_int],
) -> Result<()> {
    let file_path = c_str(file_path, "file path")?;
    let data_path = c_str(data_path, "data path")?;
    let dims = dims(data_path, lengths)?;
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|n| {
            n.checked_mul(std::mem::size_of::<T>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| ExportError::new(Stage::Shape, data_path, Cause::ShapeOverflow))?;
    let data: &[T] = if count == 0 {
        &[]
    } else if data.is_null() {
        return Err(argument_error(data_path, Cause::NullPointer("data")));
    } else {
        std::slice::from_raw_parts(data, count)
    };
    export(file_path, data_path, data, &dims)
}

fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}

macro_rules! ffi_fns {
    ($ty:ty, $vector:ident, $matrix:ident, $volume:ident) => {
        #[doc = concat!("C entry point for a 1-D `", stringify!($ty), "` export.")]
        ///
        /// # Safety
        ///
        /// `file_path` and `data_path` must be NUL-terminated strings and
        /// `data` must point at `dim1_length` readable, aligned elements.
        #[no_mangle]
        pub unsafe extern "C" fn $vector(
            file_path: *const c_char,
            data_path: *const c_char,
            data: *const $ty,
            dim1_length: c_int,
        ) -> c_int {
            status(run(file_path, data_path, data, &[dim1_length]))
        }

        #[doc = concat!("C entry point for a 2-D `", stringify!($ty), "` export.")]
        ///
        /// # Safety
        ///
        /// As for the 1-D entry point, with `data` holding
        /// `dim1_length * dim2_length` elements.
        #[no_mangle]
        pub unsafe extern "C" fn $matrix(
            file_path: *const c_char,
            data_path: *const c_char,
            data: *const $ty,
            dim1_length: c_int,
            dim2_length: c_int,
        ) -> c_int {
            status(run(file_path, data_path, data, &[dim1_length, dim2_length]))
        }

        #[doc = concat!("C entry point for a 3-D `", stringify!($ty), "` export.")]
        ///
        /// # Safety
        ///
        /// As for the 1-D entry point, with `data` holding
        /// `dim1_length * dim2_length * dim3_length` elements.
        #[no_mangle]
        pub unsafe extern "C" fn $volume(
            file_path: *const c_char,
            data_path: *const c_char,
            data: *const $ty,
            dim1_length: c_int,
            dim2_length: c_int,
            dim3_length: c_int,
        ) -> c_int {
            status(run(
                file_path,
                data_path,
                data,
                &[dim1_length, dim2_length, dim3_length],
            ))
        }
    };
}

ffi_fns!(i32, h5_export_vector_i32, h5_export_matrix_i32, h5_export_volume_i32);
ffi_fns!(f32, h5_export_vector_f32, h5_export_matrix_f32, h5_export_volume_f32);
ffi_fns!(f64, h5_export_vector_f64, h5_export_matrix_f64, h5_export_volume_f64);
