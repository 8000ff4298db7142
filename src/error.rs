use std::fmt::{Display, Formatter};
use std::io;

#[derive(Debug)]
/// Errors that can occur when opening, flushing or closing a `MappedFile`.
pub enum MapError {
    /// `open` was called on an instance that already holds a mapping.
    AlreadyMapped,
    /// The operation needs an open mapping, but the instance is unmapped.
    NotMapped,
    /// The backing file could not be opened or created.
    OpenFailed(io::Error),
    /// The backing file could not be extended to the requested size.
    ResizeFailed(io::Error),
    /// The OS refused to establish the mapping.
    MapFailed(io::Error),
    /// Releasing the mapped region failed.
    UnmapFailed(io::Error),
    /// Closing the file handle or the mapping-object handle failed.
    HandleReleaseFailed(io::Error),
    /// Writing dirty pages back to the backing file failed.
    FlushFailed(io::Error),
    /// Several release steps failed; errors are kept in the order the steps ran.
    Multiple(Vec<MapError>),
}

impl MapError {
    /// Folds the failures of a release sequence into a single result.
    ///
    /// No failures is success, one failure is returned as-is, more are wrapped in [`MapError::Multiple`].
    pub(crate) fn collect(mut errors: Vec<MapError>) -> MapResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Returns the underlying OS error, if this error wraps exactly one.
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::OpenFailed(e)
            | Self::ResizeFailed(e)
            | Self::MapFailed(e)
            | Self::UnmapFailed(e)
            | Self::HandleReleaseFailed(e)
            | Self::FlushFailed(e) => Some(e),
            Self::AlreadyMapped | Self::NotMapped | Self::Multiple(_) => None,
        }
    }
}

impl Display for MapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "File is already mapped"),
            Self::NotMapped => write!(f, "File is not mapped"),
            Self::OpenFailed(e) => write!(f, "Open failed: {e}"),
            Self::ResizeFailed(e) => write!(f, "Resize failed: {e}"),
            Self::MapFailed(e) => write!(f, "Map failed: {e}"),
            Self::UnmapFailed(e) => write!(f, "Unmap failed: {e}"),
            Self::HandleReleaseFailed(e) => write!(f, "Handle release failed: {e}"),
            Self::FlushFailed(e) => write!(f, "Flush failed: {e}"),
            Self::Multiple(errors) => {
                write!(f, "{} release steps failed", errors.len())?;
                for e in errors {
                    write!(f, "; {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.io_error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type MapResult<T> = Result<T, MapError>;
