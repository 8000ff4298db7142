//! Windows backend: a file handle, a mapping object created from it, and a view of the mapping.

use std::ffi::c_void;
use std::io;
use std::os::windows::io::IntoRawHandle;
use std::path::Path;
use std::ptr::{self, NonNull};

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::Storage::FileSystem::FlushFileBuffers;
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, FlushViewOfFile, MapViewOfFile, UnmapViewOfFile, FILE_MAP_ALL_ACCESS,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};

use super::{check_map_len, open_backing_file, MapBackend};
use crate::error::{MapError, MapResult};

/// Maps files with `PAGE_READWRITE` mapping objects and `FILE_MAP_ALL_ACCESS` views.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

/// The file handle and the mapping-object handle backing a Windows mapping.
#[derive(Debug)]
pub struct WindowsHandles {
    file: HANDLE,
    mapping: HANDLE,
}

// Both handles are owned exclusively and Win32 handles may be closed from any thread.
unsafe impl Send for WindowsHandles {}
unsafe impl Sync for WindowsHandles {}

impl WindowsHandles {
    /// Returns the raw handle of the backing file.
    #[must_use]
    pub fn file(&self) -> HANDLE {
        self.file
    }

    /// Returns the raw handle of the mapping object.
    #[must_use]
    pub fn mapping(&self) -> HANDLE {
        self.mapping
    }
}

impl MapBackend for WindowsBackend {
    type Handles = WindowsHandles;

    fn acquire(&self, path: &Path, size: usize) -> MapResult<(NonNull<u8>, WindowsHandles)> {
        let file = open_backing_file(path)?.into_raw_handle() as HANDLE;
        if let Err(e) = check_map_len(size) {
            close_logged(file, "file");
            return Err(e);
        }

        // Explicit dimensions make the mapping object grow the file when it is shorter.
        let len = size as u64;
        let mapping = unsafe {
            CreateFileMappingW(
                file,
                ptr::null(),
                PAGE_READWRITE,
                (len >> 32) as u32,
                len as u32,
                ptr::null(),
            )
        };
        if mapping.is_null() {
            let err = io::Error::last_os_error();
            close_logged(file, "file");
            return Err(MapError::MapFailed(err));
        }

        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, size) };
        match NonNull::new(view.Value.cast::<u8>()) {
            Some(ptr) => Ok((ptr, WindowsHandles { file, mapping })),
            None => {
                let err = io::Error::last_os_error();
                close_logged(mapping, "mapping object");
                close_logged(file, "file");
                Err(MapError::MapFailed(err))
            }
        }
    }

    fn release(&self, ptr: NonNull<u8>, _size: usize, handles: WindowsHandles) -> Vec<MapError> {
        let mut errors = Vec::new();
        let view = MEMORY_MAPPED_VIEW_ADDRESS {
            Value: ptr.as_ptr().cast::<c_void>(),
        };
        if unsafe { UnmapViewOfFile(view) } == 0 {
            errors.push(MapError::UnmapFailed(io::Error::last_os_error()));
        }
        if let Err(e) = close_handle(handles.mapping) {
            errors.push(MapError::HandleReleaseFailed(e));
        }
        if let Err(e) = close_handle(handles.file) {
            errors.push(MapError::HandleReleaseFailed(e));
        }
        errors
    }

    fn flush(&self, ptr: NonNull<u8>, size: usize, handles: &WindowsHandles) -> MapResult<()> {
        // FlushViewOfFile only starts the write-back; FlushFileBuffers waits for it.
        if unsafe { FlushViewOfFile(ptr.as_ptr().cast::<c_void>().cast_const(), size) } == 0 {
            return Err(MapError::FlushFailed(io::Error::last_os_error()));
        }
        if unsafe { FlushFileBuffers(handles.file) } == 0 {
            return Err(MapError::FlushFailed(io::Error::last_os_error()));
        }
        Ok(())
    }
}

fn close_handle(handle: HANDLE) -> io::Result<()> {
    if unsafe { CloseHandle(handle) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn close_logged(handle: HANDLE, what: &str) {
    if let Err(e) = close_handle(handle) {
        log::warn!("closing {what} handle after failed map: {e}");
    }
}
