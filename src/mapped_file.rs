#[cfg(feature = "rand_gen")]
use crate::global_consts::{NUM_RETRY, RAND_FN_LEN, VALID_CHARS};
#[cfg(feature = "rand_gen")]
use rand::Rng;
#[cfg(feature = "rand_gen")]
use std::env;
use std::fmt::{Debug, Formatter};
#[cfg(feature = "rand_gen")]
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::slice;

#[cfg(feature = "rand_gen")]
use crate::backend::create_new_backing_file;
use crate::backend::{DefaultBackend, MapBackend};
use crate::error::{MapError, MapResult};

/// One live mapping: the view, its length, and the OS handles keeping it alive.
struct Mapping<H> {
    ptr: NonNull<u8>,
    len: usize,
    handles: H,
    path: PathBuf,
}

/// A file mapped into memory as a shared, read-write byte region.
///
/// A new instance holds no resources. [`open`](MappedFile::open) maps a file,
/// [`close`](MappedFile::close) releases it again, and the instance can then be reopened.
/// Writes through the mapped bytes reach the backing file; when they hit the disk is up to
/// the OS unless [`flush`](MappedFile::flush) is called. When the instance is dropped, any
/// open mapping is closed and errors from that close are logged.
///
/// The OS resources are acquired and released by a [`MapBackend`], which defaults to the
/// native backend of the target platform.
pub struct MappedFile<B: MapBackend = DefaultBackend> {
    backend: B,
    mapping: Option<Mapping<B::Handles>>,
}

impl MappedFile {
    /// Creates an unmapped instance using the platform's native backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(DefaultBackend::default())
    }
}

impl Default for MappedFile {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: MapBackend> MappedFile<B> {
    /// Creates an unmapped instance that acquires its resources through `backend`.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            mapping: None,
        }
    }

    /// Maps the first `size` bytes of the file at `path`.
    ///
    /// The file is opened for reading and writing and created with owner read/write
    /// permissions if it does not exist. A file shorter than `size` is extended with zero
    /// bytes; a longer one keeps its length and content.
    ///
    /// # Arguments
    ///
    /// * `path` - The backing file.
    /// * `size` - The number of bytes to map, starting at offset zero. Must not be zero.
    ///
    /// # Errors
    ///
    /// * `AlreadyMapped` if the instance already holds a mapping. The existing mapping is left untouched.
    /// * `OpenFailed` if the file cannot be opened or created.
    /// * `ResizeFailed` if the file cannot be extended to `size` bytes.
    /// * `MapFailed` if the OS refuses the mapping, including when `size` is zero.
    ///
    /// After any error the instance is still unmapped and holds no OS resources.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, size: usize) -> MapResult<()> {
        if self.mapping.is_some() {
            return Err(MapError::AlreadyMapped);
        }
        let path = path.as_ref();
        let (ptr, handles) = self.backend.acquire(path, size)?;
        log::debug!("mapped {} bytes of {}", size, path.display());
        self.mapping = Some(Mapping {
            ptr,
            len: size,
            handles,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    #[cfg(feature = "rand_gen")]
    /// Creates a backing file with a random name in the given directory and maps `size` bytes of it.
    ///
    /// The file name is generated using random ASCII characters.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory in which to create the file. If `None`, the system temporary directory is used. If a relative directory is provided, it is resolved relative to the system temporary directory.
    /// * `size` - The number of bytes to map.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyMapped` if the instance is mapped, `OpenFailed` if the file cannot be created
    /// or a unique filename cannot be generated, and otherwise the same errors as
    /// [`open`](MappedFile::open). A file created before a failed `open` is removed again.
    pub fn open_random<P: AsRef<Path>>(&mut self, dir: Option<P>, size: usize) -> MapResult<PathBuf> {
        if self.mapping.is_some() {
            return Err(MapError::AlreadyMapped);
        }
        let dir_buf = if let Some(d) = dir {
            let d_ref = d.as_ref();
            if d_ref.is_absolute() {
                d_ref.to_path_buf()
            } else {
                env::temp_dir().join(d_ref)
            }
        } else {
            env::temp_dir()
        };
        let mut rng = rand::rng();
        for _ in 0..NUM_RETRY {
            let name: String = (0..RAND_FN_LEN)
                .map(|_| {
                    let idx = rng.random_range(0..VALID_CHARS.len());
                    VALID_CHARS[idx] as char
                })
                .collect();
            let full_path = dir_buf.join(&name);
            // Claiming the name with `create_new` keeps a racing creator's file out of our hands.
            match create_new_backing_file(&full_path) {
                Ok(file) => drop(file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(MapError::OpenFailed(e)),
            }
            if let Err(e) = self.open(&full_path, size) {
                if let Err(rm) = std::fs::remove_file(&full_path) {
                    log::warn!("removing {} after failed open: {rm}", full_path.display());
                }
                return Err(e);
            }
            return Ok(full_path);
        }
        Err(MapError::OpenFailed(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Could not generate a unique filename",
        )))
    }

    /// Unmaps the region and releases the OS handles.
    ///
    /// Does nothing if the instance is not mapped. Every release step is attempted even when an
    /// earlier one fails, and the instance is unmapped afterwards either way, so a failed close
    /// is never retried on the same handles.
    ///
    /// # Errors
    ///
    /// Returns the failure of a single step as `UnmapFailed` or `HandleReleaseFailed`, or
    /// `Multiple` with one entry per failed step, in the order the steps ran.
    pub fn close(&mut self) -> MapResult<()> {
        let Some(mapping) = self.mapping.take() else {
            return Ok(());
        };
        let Mapping {
            ptr,
            len,
            handles,
            path,
        } = mapping;
        let errors = self.backend.release(ptr, len, handles);
        if errors.is_empty() {
            log::debug!("unmapped {}", path.display());
        }
        MapError::collect(errors)
    }

    /// Writes modified pages back to the backing file and waits until the OS reports completion.
    ///
    /// # Errors
    ///
    /// Returns `NotMapped` if there is nothing to flush, or `FlushFailed` if the OS reports an error.
    pub fn flush(&self) -> MapResult<()> {
        let mapping = self.mapping.as_ref().ok_or(MapError::NotMapped)?;
        self.backend
            .flush(mapping.ptr, mapping.len, &mapping.handles)
    }

    /// Returns the address of the mapped region, or a null pointer when unmapped.
    ///
    /// The pointer is valid for [`len`](MappedFile::len) bytes until the next
    /// [`close`](MappedFile::close) or until the instance is dropped. Prefer
    /// [`as_slice`](MappedFile::as_slice) and [`as_mut_slice`](MappedFile::as_mut_slice),
    /// whose borrows cannot outlive the mapping.
    #[must_use]
    pub fn data_ptr(&self) -> *mut u8 {
        self.mapping
            .as_ref()
            .map_or(ptr::null_mut(), |m| m.ptr.as_ptr())
    }

    /// Returns the mapped bytes, or `None` when unmapped.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[u8]> {
        self.mapping
            .as_ref()
            .map(|m| unsafe { slice::from_raw_parts(m.ptr.as_ptr(), m.len) })
    }

    /// Returns the mapped bytes for writing, or `None` when unmapped.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        self.mapping
            .as_mut()
            .map(|m| unsafe { slice::from_raw_parts_mut(m.ptr.as_ptr(), m.len) })
    }

    /// Returns the length of the mapping in bytes, `0` when unmapped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.as_ref().map_or(0, |m| m.len)
    }

    /// Checks if no bytes are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if the instance currently holds a mapping.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Returns the path the current mapping was opened from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.mapping.as_ref().map(|m| m.path.as_path())
    }

    /// Returns the OS handles of the current mapping.
    #[must_use]
    pub fn handles(&self) -> Option<&B::Handles> {
        self.mapping.as_ref().map(|m| &m.handles)
    }

    /// Returns the backend this instance maps through.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: MapBackend> Deref for MappedFile<B> {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        // An unmapped instance reads as an empty buffer.
        self.as_slice().unwrap_or(&[])
    }
}

impl<B: MapBackend> DerefMut for MappedFile<B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice().unwrap_or(&mut [])
    }
}

impl<B: MapBackend> AsRef<[u8]> for MappedFile<B> {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl<B: MapBackend> AsMut<[u8]> for MappedFile<B> {
    fn as_mut(&mut self) -> &mut [u8] {
        self
    }
}

impl<B: MapBackend> Debug for MappedFile<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path())
            .field("ptr", &self.data_ptr())
            .field("len", &self.len())
            .finish()
    }
}

impl<B: MapBackend> Drop for MappedFile<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("closing mapped file on drop: {e}");
        }
    }
}

// The region is owned exclusively by the instance, and writing through it needs `&mut self`.
unsafe impl<B> Send for MappedFile<B>
where
    B: MapBackend + Send,
    B::Handles: Send,
{
}
unsafe impl<B> Sync for MappedFile<B>
where
    B: MapBackend + Sync,
    B::Handles: Sync,
{
}
