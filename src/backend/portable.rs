//! A backend built on `memmap2`, for targets where the native backends are not wanted.
//!
//! `memmap2` unmaps and closes inside `Drop`, so failures in those steps cannot be observed;
//! [`MapBackend::release`] always reports success here.

use std::fs::File;
use std::path::Path;
use std::ptr::NonNull;

use memmap2::{MmapMut, MmapOptions};

use super::{check_map_len, ensure_len, open_backing_file, MapBackend};
use crate::error::{MapError, MapResult};

/// Maps files through `memmap2::MmapMut`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Memmap2Backend;

/// The `memmap2` view and the file it was created from.
#[derive(Debug)]
pub struct Memmap2Handles {
    map: MmapMut,
    file: File,
}

impl Memmap2Handles {
    /// Returns the backing file.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl MapBackend for Memmap2Backend {
    type Handles = Memmap2Handles;

    fn acquire(&self, path: &Path, size: usize) -> MapResult<(NonNull<u8>, Memmap2Handles)> {
        let file = open_backing_file(path)?;
        check_map_len(size)?;
        ensure_len(&file, size)?;
        let mut map = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&file)
                .map_err(MapError::MapFailed)?
        };
        // The view address does not change when `MmapMut` is moved.
        let ptr = NonNull::new(map.as_mut_ptr()).ok_or_else(|| {
            MapError::MapFailed(std::io::Error::other("memmap2 returned a null address"))
        })?;
        Ok((ptr, Memmap2Handles { map, file }))
    }

    fn release(&self, _ptr: NonNull<u8>, _size: usize, handles: Memmap2Handles) -> Vec<MapError> {
        let Memmap2Handles { map, file } = handles;
        drop(map);
        drop(file);
        Vec::new()
    }

    fn flush(&self, _ptr: NonNull<u8>, _size: usize, handles: &Memmap2Handles) -> MapResult<()> {
        handles.map.flush().map_err(MapError::FlushFailed)
    }
}
