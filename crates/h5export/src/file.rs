//! Container file handles: open-or-create, flush on close.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use h5export_format::Container;
use tempfile::NamedTempFile;

use crate::error::{Cause, ExportError, Result, Stage};

/// Which branch [`open_file`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// An existing file was opened read-write.
    Opened,
    /// A new empty file was created.
    Created,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpenMode::Opened => "open",
            OpenMode::Created => "create",
        })
    }
}

/// A container file loaded into memory for editing.
///
/// Edits go through [`container_mut`](Self::container_mut) and reach the
/// disk on [`close`](Self::close). A handle dropped with unsaved edits
/// flushes them on a best-effort basis.
#[derive(Debug)]
pub struct ContainerFile {
    path: PathBuf,
    container: Container,
    mode: OpenMode,
    dirty: bool,
}

/// Open the container file at `path` read-write, or create an empty one if
/// it cannot be opened for reading and writing.
///
/// The create branch writes the empty file immediately. Failures are
/// logged with the path and the attempted mode.
pub fn open_file(path: impl AsRef<Path>) -> Result<ContainerFile> {
    let path = path.as_ref();
    let probe = OpenOptions::new().read(true).write(true).open(path);

    let (container, mode) = match probe {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            let container = file
                .read_to_end(&mut bytes)
                .map_err(Cause::from)
                .and_then(|_| Container::from_bytes(&bytes).map_err(Cause::from))
                .map_err(|cause| open_failure(path, OpenMode::Opened, cause))?;
            (container, OpenMode::Opened)
        }
        Err(_) => {
            let container = Container::new();
            container
                .to_bytes()
                .map_err(Cause::from)
                .and_then(|bytes| fs::write(path, bytes).map_err(Cause::from))
                .map_err(|cause| open_failure(path, OpenMode::Created, cause))?;
            (container, OpenMode::Created)
        }
    };
    match mode {
        OpenMode::Opened => log::debug!("opened existing file \"{}\"", path.display()),
        OpenMode::Created => log::debug!("created \"{}\"", path.display()),
    }

    Ok(ContainerFile {
        path: path.to_path_buf(),
        container,
        mode,
        dirty: false,
    })
}

fn open_failure(path: &Path, mode: OpenMode, cause: Cause) -> ExportError {
    log::error!("Failed to {mode} \"{}\" ({cause})", path.display());
    let stage = match mode {
        OpenMode::Opened => Stage::Open,
        OpenMode::Created => Stage::Create,
    };
    ExportError::new(stage, path.display().to_string(), cause)
}

impl ContainerFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Mutable access to the tree; marks the file as needing a flush.
    pub fn container_mut(&mut self) -> &mut Container {
        self.dirty = true;
        &mut self.container
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize the tree and replace the file with it.
    ///
    /// The new image is written to a temporary file next to the target and
    /// renamed over it, so a failed flush leaves the previous image intact.
    pub fn flush(&mut self) -> Result<()> {
        let bytes = self
            .container
            .to_bytes()
            .map_err(|e| self.close_failure(e.into()))?;
        replace_file(&self.path, &bytes).map_err(|e| self.close_failure(e.into()))?;
        self.dirty = false;
        Ok(())
    }

    /// Flush pending edits and release the handle.
    pub fn close(mut self) -> Result<()> {
        let result = if self.dirty { self.flush() } else { Ok(()) };
        // a failed flush is reported here, not retried on drop
        self.dirty = false;
        result
    }

    fn close_failure(&self, cause: Cause) -> ExportError {
        log::error!("Failed to close \"{}\" ({cause})", self.path.display());
        ExportError::new(Stage::Close, self.path.display().to_string(), cause)
    }
}

fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    replace_file_with(path, |tmp| tmp.write_all(bytes))
}

/// Fill a temporary file next to `path` with `fill` and rename it over
/// `path`. On error the temporary file is removed and `path` is untouched.
fn replace_file_with(
    path: &Path,
    fill: impl FnOnce(&mut NamedTempFile) -> io::Result<()>,
) -> io::Result<()> {
    // replace the file a symlink points at, not the link
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    fill(&mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

impl Drop for ContainerFile {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                log::warn!("unsaved edits to \"{}\" were lost: {e}", self.path.display());
            }
        }
    }
}
