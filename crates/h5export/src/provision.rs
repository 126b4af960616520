//! Dataset provisioning: make sure a freshly shaped dataset sits at a path.

use h5export_format::dataspace::Dataspace;
use h5export_format::property_list::LinkCreateProps;
use h5export_format::DatasetRef;

use crate::error::{Cause, ExportError, Result, Stage};
use crate::file::ContainerFile;
use crate::path::{path_exists, prefixes};
use crate::types::TypeTag;

/// Dimension lengths of an exported array: one to three, none zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    space: Dataspace,
}

impl Shape {
    pub const MAX_RANK: usize = 3;

    pub fn new(dims: &[usize]) -> std::result::Result<Shape, Cause> {
        if dims.is_empty() || dims.len() > Self::MAX_RANK {
            return Err(Cause::InvalidRank(dims.len()));
        }
        if let Some(index) = dims.iter().position(|&d| d == 0) {
            return Err(Cause::ZeroDimension { index });
        }
        let dims: Vec<u64> = dims.iter().map(|&d| d as u64).collect();
        Ok(Shape {
            space: Dataspace::simple(&dims)?,
        })
    }

    pub fn dims(&self) -> &[u64] {
        &self.space.dimensions
    }

    pub fn rank(&self) -> usize {
        self.space.rank()
    }

    pub fn num_elements(&self) -> u64 {
        self.space.num_elements()
    }

    pub fn dataspace(&self) -> &Dataspace {
        &self.space
    }
}

/// Guarantee a new dataset of element type `disk` and shape `dims` at
/// `path`, replacing whatever link was there.
///
/// Missing intermediate groups are created. A failure part way through
/// leaves earlier steps applied: a replaced dataset stays deleted.
pub fn provision_dataset(
    file: &mut ContainerFile,
    path: &str,
    disk: TypeTag,
    dims: &[usize],
) -> Result<DatasetRef> {
    if path_exists(file.container(), path).map_err(|e| {
        log::error!("Failed to determine if \"{path}\" exists ({})", e.source);
        e
    })? {
        file.container_mut().unlink(path).map_err(|e| {
            log::error!("Failed to delete the existing dataset \"{path}\" ({e})");
            ExportError::new(Stage::Delete, path, e)
        })?;
        log::debug!("deleted the previous \"{path}\"");
    }

    let lcpl = LinkCreateProps::new().create_intermediate_groups(true);

    let shape = Shape::new(dims).map_err(|cause| {
        log::error!(
            "Failed to create a simple dataspace of {} dimension{} for \"{path}\" ({cause})",
            dims.len(),
            if dims.len() == 1 { "" } else { "s" },
        );
        ExportError::new(Stage::Shape, path, cause)
    })?;

    let new_groups: Vec<&str> = prefixes(path)
        .filter(|p| p.len() > 1 && p.ends_with('/'))
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| !matches!(file.container().get(p), Ok(Some(_))))
        .collect();

    let ds = file
        .container_mut()
        .create_dataset(path, disk.to_datatype(), shape.dataspace(), &lcpl)
        .map_err(|e| {
            log::error!("Failed to create \"{path}\" ({e})");
            ExportError::new(Stage::CreateDataset, path, e)
        })?;
    if !new_groups.is_empty() {
        log::debug!("created intermediate groups {new_groups:?} for \"{path}\"");
    }
    log::debug!("created {disk} dataset \"{}\" with shape {:?}", ds.path(), shape.dims());
    Ok(ds)
}
