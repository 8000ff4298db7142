//! Platform backends that acquire and release the OS resources behind a mapping.
//!
//! [`MappedFile`](crate::MappedFile) only drives the lifecycle; everything that touches
//! file descriptors, handles or the kernel's mapping calls lives behind [`MapBackend`].
//! The backend for the current target is picked at build time as [`DefaultBackend`].

use std::fs::{File, OpenOptions};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

#[cfg(unix)]
use crate::global_consts::FILE_MODE;
use crate::error::{MapError, MapResult};

#[cfg(feature = "memmap2_backend")]
pub mod portable;
#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
/// The backend used by `MappedFile` unless another one is named.
pub type DefaultBackend = unix::PosixBackend;

#[cfg(windows)]
/// The backend used by `MappedFile` unless another one is named.
pub type DefaultBackend = windows::WindowsBackend;

/// Acquisition and release of one file-backed shared read-write mapping.
pub trait MapBackend {
    /// The OS handles that stay open for as long as the mapping exists.
    type Handles;

    /// Opens (creating if absent) the file at `path` and maps bytes `[0, size)` of it.
    ///
    /// On success the returned pointer addresses `size` writable bytes. On failure every
    /// resource acquired along the way has already been released.
    ///
    /// # Errors
    ///
    /// `OpenFailed`, `ResizeFailed` or `MapFailed`, depending on the step that failed.
    fn acquire(&self, path: &Path, size: usize) -> MapResult<(NonNull<u8>, Self::Handles)>;

    /// Unmaps the region and closes the handles, in that order.
    ///
    /// Every step is attempted even if an earlier one failed. The returned vector holds one
    /// error per failed step, in step order; it is empty on full success.
    fn release(&self, ptr: NonNull<u8>, size: usize, handles: Self::Handles) -> Vec<MapError>;

    /// Writes dirty pages of the region back to the backing file and waits for completion.
    ///
    /// # Errors
    ///
    /// Returns `FlushFailed` if the OS reports an error.
    fn flush(&self, ptr: NonNull<u8>, size: usize, handles: &Self::Handles) -> MapResult<()>;
}

/// Opens `path` read-write, creating it with owner read/write permissions if it is missing.
pub(crate) fn open_backing_file(path: &Path) -> MapResult<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    options.open(path).map_err(MapError::OpenFailed)
}

/// Creates `path` read-write with owner read/write permissions, failing if it already exists.
#[cfg(feature = "rand_gen")]
pub(crate) fn create_new_backing_file(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    options.open(path)
}

/// Grows `file` to `size` bytes when it is shorter. Longer files are left as they are.
#[cfg(any(unix, feature = "memmap2_backend"))]
pub(crate) fn ensure_len(file: &File, size: usize) -> MapResult<()> {
    let wanted = u64::try_from(size)
        .map_err(|_| MapError::ResizeFailed(io::Error::from(io::ErrorKind::InvalidInput)))?;
    let current = file.metadata().map_err(MapError::ResizeFailed)?.len();
    if current < wanted {
        file.set_len(wanted).map_err(MapError::ResizeFailed)?;
    }
    Ok(())
}

/// Rejects lengths no mapping can have: zero, or more than a slice may span.
pub(crate) fn check_map_len(size: usize) -> MapResult<()> {
    if size == 0 {
        return Err(MapError::MapFailed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "cannot map zero bytes",
        )));
    }
    if isize::try_from(size).is_err() {
        return Err(MapError::MapFailed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "mapping length exceeds isize::MAX",
        )));
    }
    Ok(())
}
