#[cfg(test)]
mod tests {
    use mapfile::{MapError, MappedFile};
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    /// A path in the system temp directory, with any leftover file from an earlier run removed.
    fn fresh_path(name: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_mutation_persists_across_remap() {
        let path = fresh_path("test_mapfile_persist.bin");
        fs::write(&path, [1u8, 2, 3, 4]).expect("Failed to write sample file");

        let mut mapped = MappedFile::new();
        mapped.open(&path, 4).expect("Failed to map file");
        assert_eq!(mapped.as_slice().expect("Not mapped"), &[1, 2, 3, 4]);
        mapped[2] = 20;
        mapped.close().expect("Failed to close mapping");

        mapped.open(&path, 4).expect("Failed to remap file");
        assert_eq!(&mapped[..], &[1, 2, 20, 4]);
        mapped.close().expect("Failed to close mapping");

        assert_eq!(fs::read(&path).expect("Failed to read file"), [1, 2, 20, 4]);
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_packed_integers_read_through_mapping() {
        let path = fresh_path("test_mapfile_ints.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&20u32.to_le_bytes());
        fs::write(&path, &bytes).expect("Failed to write sample file");

        let mut mapped = MappedFile::new();
        mapped.open(&path, 8).expect("Failed to map file");
        let values: Vec<u32> = mapped
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().expect("Chunk is not 4 bytes")))
            .collect();
        assert_eq!(values, [10, 20]);
        drop(mapped);
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_open_creates_and_sizes_missing_file() {
        let path = fresh_path("test_mapfile_create.bin");
        {
            let mut mapped = MappedFile::new();
            mapped.open(&path, 4).expect("Failed to map new file");
            assert!(!mapped.data_ptr().is_null());
            assert_eq!(mapped.len(), 4);
            assert_eq!(&mapped[..], &[0, 0, 0, 0]);
        }
        let len = fs::metadata(&path).expect("File was not created").len();
        assert!(len >= 4);
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[cfg(unix)]
    #[test]
    fn test_created_file_is_owner_read_write() {
        use std::os::unix::fs::PermissionsExt;

        let path = fresh_path("test_mapfile_mode.bin");
        let mut mapped = MappedFile::new();
        mapped.open(&path, 1).expect("Failed to map new file");
        mapped.close().expect("Failed to close mapping");
        let mode = fs::metadata(&path).expect("Missing file").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_every_byte_of_multi_page_mapping_is_addressable() {
        let path = fresh_path("test_mapfile_pages.bin");
        let size = 3 * 4096 + 17;
        let mut mapped = MappedFile::new();
        mapped.open(&path, size).expect("Failed to map file");
        for (i, b) in mapped.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        mapped.close().expect("Failed to close mapping");

        mapped.open(&path, size).expect("Failed to remap file");
        assert!(mapped.iter().enumerate().all(|(i, b)| *b == (i % 251) as u8));
        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_longer_file_keeps_length_and_tail() {
        let path = fresh_path("test_mapfile_tail.bin");
        fs::write(&path, b"abcdefgh").expect("Failed to write sample file");
        {
            let mut mapped = MappedFile::new();
            mapped.open(&path, 4).expect("Failed to map file");
            assert_eq!(&mapped[..], b"abcd");
            mapped.copy_from_slice(b"WXYZ");
        }
        assert_eq!(fs::read(&path).expect("Failed to read file"), b"WXYZefgh");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_open_twice_fails_and_keeps_mapping() {
        let path = fresh_path("test_mapfile_twice.bin");
        let other = fresh_path("test_mapfile_twice_other.bin");
        let mut mapped = MappedFile::new();
        mapped.open(&path, 4).expect("Failed to map file");
        mapped[0] = 9;
        let ptr = mapped.data_ptr();

        let err = mapped.open(&other, 8).expect_err("Second open should fail");
        assert!(matches!(err, MapError::AlreadyMapped));
        assert_eq!(mapped.data_ptr(), ptr);
        assert_eq!(mapped.len(), 4);
        assert_eq!(mapped[0], 9);
        assert!(!other.exists());

        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let path = env::temp_dir()
            .join("test_mapfile_no_such_dir")
            .join("file.bin");
        let mut mapped = MappedFile::new();
        let err = mapped.open(&path, 4).expect_err("Open should fail");
        assert!(matches!(err, MapError::OpenFailed(_)));
        assert!(!mapped.is_mapped());
        assert!(mapped.data_ptr().is_null());
    }

    #[test]
    fn test_zero_length_mapping_is_rejected() {
        let path = fresh_path("test_mapfile_zero.bin");
        let mut mapped = MappedFile::new();
        let err = mapped.open(&path, 0).expect_err("Zero-length map should fail");
        assert!(matches!(err, MapError::MapFailed(_)));
        assert!(!mapped.is_mapped());
        assert_eq!(mapped.len(), 0);

        // The handle was released, so the instance is reusable.
        mapped.open(&path, 2).expect("Failed to map file after rejected open");
        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_oversized_mapping_is_rejected_without_resizing() {
        let path = fresh_path("test_mapfile_oversized.bin");
        fs::write(&path, [1u8, 2]).expect("Failed to write sample file");
        let mut mapped = MappedFile::new();
        let err = mapped
            .open(&path, usize::MAX)
            .expect_err("Oversized map should fail");
        assert!(matches!(err, MapError::MapFailed(_)));
        assert_eq!(
            err.io_error().map(std::io::Error::kind),
            Some(std::io::ErrorKind::InvalidInput)
        );
        assert!(!mapped.is_mapped());
        assert!(mapped.data_ptr().is_null());
        assert_eq!(fs::metadata(&path).expect("Missing file").len(), 2);

        mapped.open(&path, 2).expect("Failed to map file after rejected open");
        assert_eq!(&mapped[..], &[1, 2]);
        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unresizable_file_reports_resize_failure() {
        // A character device opens read-write but cannot be truncated.
        let mut mapped = MappedFile::new();
        let err = mapped
            .open("/dev/null", 4)
            .expect_err("Resizing /dev/null should fail");
        assert!(matches!(err, MapError::ResizeFailed(_)));
        assert!(!mapped.is_mapped());
        assert!(mapped.data_ptr().is_null());

        let path = fresh_path("test_mapfile_after_resize_failure.bin");
        mapped.open(&path, 4).expect("Failed to map file after resize failure");
        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_close_is_idempotent() {
        let path = fresh_path("test_mapfile_close.bin");
        let mut mapped = MappedFile::new();
        mapped.close().expect("Close on fresh instance failed");
        mapped.open(&path, 4).expect("Failed to map file");
        assert!(mapped.handles().is_some());
        mapped.close().expect("Failed to close mapping");
        assert!(mapped.handles().is_none());
        assert!(mapped.path().is_none());
        mapped.close().expect("Second close failed");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[test]
    fn test_flush_writes_back_while_mapped() {
        let path = fresh_path("test_mapfile_flush.bin");
        let mut mapped = MappedFile::new();
        assert!(matches!(mapped.flush(), Err(MapError::NotMapped)));
        mapped.open(&path, 4).expect("Failed to map file");
        mapped.copy_from_slice(&[5, 6, 7, 8]);
        mapped.flush().expect("Failed to flush mapping");
        assert_eq!(fs::read(&path).expect("Failed to read file"), [5, 6, 7, 8]);
        mapped.close().expect("Failed to close mapping");
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[cfg(feature = "rand_gen")]
    #[test]
    fn test_open_random_creates_unique_file() {
        let mut mapped = MappedFile::new();
        let path = mapped
            .open_random::<PathBuf>(None, 16)
            .expect("Failed to map random file");
        assert!(path.starts_with(env::temp_dir()));
        assert_eq!(mapped.path(), Some(path.as_path()));
        assert!(matches!(
            mapped.open_random::<PathBuf>(None, 16),
            Err(MapError::AlreadyMapped)
        ));
        mapped.close().expect("Failed to close mapping");
        assert_eq!(fs::metadata(&path).expect("Missing file").len(), 16);
        fs::remove_file(&path).expect("Failed to remove file");
    }

    #[cfg(feature = "rand_gen")]
    #[test]
    fn test_open_random_in_missing_directory_fails_fast() {
        let dir = env::temp_dir().join("test_mapfile_random_no_such_dir");
        let mut mapped = MappedFile::new();
        let err = mapped
            .open_random(Some(&dir), 8)
            .expect_err("Open in missing directory should fail");
        match err {
            MapError::OpenFailed(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(!mapped.is_mapped());
        assert!(!dir.exists());
    }

    #[cfg(feature = "rand_gen")]
    #[test]
    fn test_open_random_removes_file_when_mapping_fails() {
        let dir = env::temp_dir().join("test_mapfile_random_zero");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("Failed to create directory");
        let mut mapped = MappedFile::new();
        let err = mapped
            .open_random(Some(&dir), 0)
            .expect_err("Zero-length map should fail");
        assert!(matches!(err, MapError::MapFailed(_)));
        let leftovers = fs::read_dir(&dir).expect("Failed to list directory").count();
        assert_eq!(leftovers, 0);
        fs::remove_dir(&dir).expect("Failed to remove directory");
    }

    #[cfg(feature = "memmap2_backend")]
    #[test]
    fn test_memmap2_backend_persists_writes() {
        use mapfile::backend::portable::Memmap2Backend;

        let path = fresh_path("test_mapfile_memmap2.bin");
        fs::write(&path, [1u8, 2, 3, 4]).expect("Failed to write sample file");
        let mut mapped = MappedFile::with_backend(Memmap2Backend);
        mapped.open(&path, 4).expect("Failed to map file");
        mapped[3] = 40;
        mapped.flush().expect("Failed to flush mapping");
        mapped.close().expect("Failed to close mapping");

        assert!(matches!(
            mapped.open(&path, usize::MAX),
            Err(MapError::MapFailed(_))
        ));
        assert_eq!(fs::metadata(&path).expect("Missing file").len(), 4);

        mapped.open(&path, 6).expect("Failed to remap file");
        assert_eq!(&mapped[..], &[1, 2, 3, 40, 0, 0]);
        assert!(matches!(
            mapped.open(&path, 6),
            Err(MapError::AlreadyMapped)
        ));
        drop(mapped);
        fs::remove_file(&path).expect("Failed to remove file");
    }
}
