use std::fs;
use mapfile::{MapError, MappedFile};

fn main() -> Result<(), MapError> {
    // Two packed 4-byte integers.
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(&10u32.to_le_bytes());
    bytes.extend_from_slice(&20u32.to_le_bytes());
    fs::write("ints_example.bin", &bytes).map_err(MapError::OpenFailed)?;

    let mut mapped = MappedFile::new();
    mapped.open("ints_example.bin", 8)?;
    for chunk in mapped.chunks_exact(4) {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        println!("{}", u32::from_le_bytes(raw));
    }

    // Double the second value in place and make sure it reaches the disk.
    let second = u32::from_le_bytes([mapped[4], mapped[5], mapped[6], mapped[7]]);
    mapped[4..8].copy_from_slice(&(second * 2).to_le_bytes());
    mapped.flush()?;
    mapped.close()
}
