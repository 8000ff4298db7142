//! POSIX backend: `open(2)` + `ftruncate(2)` + `mmap(2)`, torn down with `munmap(2)` + `close(2)`.

use std::fs::File;
use std::io;
use std::os::fd::{IntoRawFd, RawFd};
use std::path::Path;
use std::ptr::{self, NonNull};

use super::{check_map_len, ensure_len, open_backing_file, MapBackend};
use crate::error::{MapError, MapResult};

/// Maps files with `MAP_SHARED` and `PROT_READ | PROT_WRITE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixBackend;

/// The file descriptor backing a POSIX mapping.
#[derive(Debug)]
pub struct PosixHandles {
    fd: RawFd,
}

impl PosixHandles {
    /// Returns the raw descriptor of the backing file.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl MapBackend for PosixBackend {
    type Handles = PosixHandles;

    fn acquire(&self, path: &Path, size: usize) -> MapResult<(NonNull<u8>, PosixHandles)> {
        let file = open_backing_file(path)?;
        // A length that can never be mapped must not grow the file.
        if let Err(e) = check_map_len(size) {
            discard(file);
            return Err(e);
        }
        // Mapping past end of file faults on access, so the file is sized first.
        if let Err(e) = ensure_len(&file, size) {
            discard(file);
            return Err(e);
        }

        let fd = file.into_raw_fd();
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            if let Err(e) = close_fd(fd) {
                log::warn!("closing fd {fd} after failed mmap: {e}");
            }
            return Err(MapError::MapFailed(err));
        }

        match NonNull::new(addr.cast::<u8>()) {
            Some(ptr) => Ok((ptr, PosixHandles { fd })),
            None => {
                // Only possible with MAP_FIXED, but a null view must never be handed out.
                if unsafe { libc::munmap(addr, size) } == -1 {
                    log::warn!("unmapping null view: {}", io::Error::last_os_error());
                }
                if let Err(e) = close_fd(fd) {
                    log::warn!("closing fd {fd} after null mmap: {e}");
                }
                Err(MapError::MapFailed(io::Error::other(
                    "mmap returned a null address",
                )))
            }
        }
    }

    fn release(&self, ptr: NonNull<u8>, size: usize, handles: PosixHandles) -> Vec<MapError> {
        let mut errors = Vec::new();
        if unsafe { libc::munmap(ptr.as_ptr().cast::<libc::c_void>(), size) } == -1 {
            errors.push(MapError::UnmapFailed(io::Error::last_os_error()));
        }
        if let Err(e) = close_fd(handles.fd) {
            errors.push(MapError::HandleReleaseFailed(e));
        }
        errors
    }

    fn flush(&self, ptr: NonNull<u8>, size: usize, _handles: &PosixHandles) -> MapResult<()> {
        let rc = unsafe { libc::msync(ptr.as_ptr().cast::<libc::c_void>(), size, libc::MS_SYNC) };
        if rc == -1 {
            return Err(MapError::FlushFailed(io::Error::last_os_error()));
        }
        Ok(())
    }
}

/// Closes `fd`, reporting the error `File`'s drop would swallow.
fn close_fd(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Releases a file that never got mapped.
fn discard(file: File) {
    let fd = file.into_raw_fd();
    if let Err(e) = close_fd(fd) {
        log::warn!("closing fd {fd} after failed open: {e}");
    }
}
