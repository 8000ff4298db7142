use mapfile::{MapError, MappedFile};

fn main() -> Result<(), MapError> {
    // Map a fresh, randomly named file in the system's temp directory.
    let mut mapped = MappedFile::new();
    let path = mapped.open_random::<std::path::PathBuf>(None, 4096)?;
    println!("Mapped {} bytes of {}", mapped.len(), path.display());

    mapped[..5].copy_from_slice(b"hello");
    mapped.close()?;

    if let Err(e) = std::fs::remove_file(&path) {
        eprintln!("Could not remove {}: {e}", path.display());
    }
    Ok(())
}
