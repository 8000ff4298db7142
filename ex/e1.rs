use std::fs;
use mapfile::{MapError, MappedFile};

fn main() -> Result<(), MapError> {
    // Write a small sample file with ordinary file I/O.
    fs::write("tout_example.bin", [1u8, 2, 3, 4]).map_err(MapError::OpenFailed)?;

    // Map it and read the bytes straight out of memory.
    let mut mapped = MappedFile::new();
    mapped.open("tout_example.bin", 4)?;
    println!("{:?}", &mapped[..]);

    // Change a byte in place, then unmap.
    mapped[2] = 20;
    mapped.close()?;

    // Mapping the file again shows the change made it to disk.
    mapped.open("tout_example.bin", 4)?;
    println!("{:?}", &mapped[..]);

    // `mapped` is closed when it goes out of scope.
    Ok(())
}
