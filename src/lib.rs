#[cfg(not(any(unix, windows)))]
compile_error!("mapfile only supports unix and windows targets");

pub mod backend;
pub mod error;
mod global_consts;
pub mod mapped_file;

pub use backend::{DefaultBackend, MapBackend};
pub use error::*;
pub use mapped_file::MappedFile;
