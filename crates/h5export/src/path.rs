//! Component-by-component link path validation.
//!
//! [`Container::link_exists`] only answers for the last component of a
//! path and fails outright when an earlier one is missing. Checking each
//! prefix in turn gives a clean not-found for a missing parent instead.

use h5export_format::Container;

use crate::error::{ExportError, Result, Stage};

/// The prefixes of `path`, each ending just after a `/`, then the full path.
///
/// `"/a/b/c"` yields `"/"`, `"/a/"`, `"/a/b/"`, `"/a/b/c"`. A path ending in
/// `/` has no separate final entry.
pub fn prefixes(path: &str) -> impl Iterator<Item = &str> + '_ {
    let mut end = 0;
    path.split_inclusive('/').map(move |segment| {
        end += segment.len();
        &path[..end]
    })
}

/// Does every component of `path` exist?
///
/// Walks the prefixes left to right. A missing prefix ends the walk with
/// `Ok(false)`; a lookup error (an empty path, a dataset used as a group)
/// is logged and returned as a [`Stage::PathCheck`] failure.
pub fn path_exists(container: &Container, path: &str) -> Result<bool> {
    let mut checked = false;
    for prefix in prefixes(path) {
        checked = true;
        if !check(container, prefix)? {
            log::debug!("\"{prefix}\" does not exist");
            return Ok(false);
        }
    }
    if !checked {
        // nothing to split: a single check of the whole path
        return check(container, path);
    }
    Ok(true)
}

fn check(container: &Container, prefix: &str) -> Result<bool> {
    container.link_exists(prefix).map_err(|e| {
        log::error!("Failed to check \"{prefix}\" for existence ({e})");
        ExportError::new(Stage::PathCheck, prefix, e)
    })
}
