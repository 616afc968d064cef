//! Swap backing stores.
//!
//! A backing store is a flat byte space addressed by page-aligned offsets,
//! the same size as physical memory. There is no header: page `n` lives at
//! byte `n * page_size`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};

/// Page-granular persistent storage behind the MMU.
pub trait BackingStore {
    fn page_size(&self) -> usize;

    fn page_count(&self) -> usize;

    /// Return exactly one page; never-written pages read as zeros.
    fn read_page(&mut self, page: usize) -> MemoryResult<Vec<u8>>;

    /// Overwrite one page in place. `data` must be exactly one page long.
    fn write_page(&mut self, page: usize, data: &[u8]) -> MemoryResult<()>;

    fn check_page(&self, page: usize) -> MemoryResult<()> {
        let pages = self.page_count();
        if page >= pages {
            return Err(MemoryError::PageOutOfRange { page, pages });
        }
        Ok(())
    }

    fn check_len(&self, page: usize, data: &[u8]) -> MemoryResult<()> {
        let page_size = self.page_size();
        if data.len() != page_size {
            return Err(MemoryError::SizeMismatch {
                page,
                offset: 0,
                len: data.len(),
                available: page_size,
            });
        }
        Ok(())
    }
}

/// Swap space kept in a regular file, through one long-lived handle.
#[derive(Debug)]
pub struct SwapFile {
    path: PathBuf,
    file: File,
    page_size: usize,
    page_count: usize,
}

impl SwapFile {
    /// Remove any stale file at `path` and recreate it zero-filled, sized to
    /// physical memory.
    pub fn create<P: AsRef<Path>>(path: P, config: &MemoryConfig) -> MemoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed stale swap file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MemoryError::backing("remove", 0)(e)),
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(MemoryError::backing("create", 0))?;
        file.set_len(config.physical_size() as u64)
            .map_err(MemoryError::backing("resize", 0))?;

        debug!(
            "created swap file {} ({} pages of {} bytes)",
            path.display(),
            config.page_count(),
            config.page_size()
        );
        Ok(SwapFile {
            path,
            file,
            page_size: config.page_size(),
            page_count: config.page_count(),
        })
    }

    /// Reuse an existing swap file; its length must match physical memory.
    pub fn open<P: AsRef<Path>>(path: P, config: &MemoryConfig) -> MemoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(MemoryError::backing("open", 0))?;
        let len = file.metadata().map_err(MemoryError::backing("stat", 0))?.len();
        let expected = config.physical_size() as u64;
        if len != expected {
            return Err(MemoryError::BackingStore {
                op: "open",
                offset: len,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("swap file is {} bytes, expected {}", len, expected),
                ),
            });
        }

        Ok(SwapFile {
            path,
            file,
            page_size: config.page_size(),
            page_count: config.page_count(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle and delete the file.
    pub fn remove(self) -> MemoryResult<()> {
        let SwapFile { path, file, .. } = self;
        drop(file);
        fs::remove_file(&path).map_err(MemoryError::backing("remove", 0))?;
        debug!("removed swap file {}", path.display());
        Ok(())
    }

    fn seek_page(&mut self, op: &'static str, page: usize) -> MemoryResult<u64> {
        let offset = (page * self.page_size) as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(MemoryError::backing(op, offset))?;
        Ok(offset)
    }
}

impl BackingStore for SwapFile {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn read_page(&mut self, page: usize) -> MemoryResult<Vec<u8>> {
        self.check_page(page)?;
        let offset = self.seek_page("read", page)?;
        let mut buf = vec![0u8; self.page_size];
        // a truncated file surfaces as UnexpectedEof
        self.file
            .read_exact(&mut buf)
            .map_err(MemoryError::backing("read", offset))?;
        Ok(buf)
    }

    fn write_page(&mut self, page: usize, data: &[u8]) -> MemoryResult<()> {
        self.check_page(page)?;
        self.check_len(page, data)?;
        let offset = self.seek_page("write", page)?;
        self.file
            .write_all(data)
            .and_then(|()| self.file.flush())
            .map_err(MemoryError::backing("write", offset))?;
        Ok(())
    }
}

/// In-memory swap space, for tests and throwaway runs.
pub struct MemoryDisk {
    data: Box<[u8]>,
    page_size: usize,
}

impl MemoryDisk {
    /// Create a new disk initialized to all zeros
    pub fn new(config: &MemoryConfig) -> Self {
        MemoryDisk {
            data: vec![0u8; config.physical_size()].into_boxed_slice(),
            page_size: config.page_size(),
        }
    }

    /// Raw view of the whole disk
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl BackingStore for MemoryDisk {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> usize {
        self.data.len() / self.page_size
    }

    fn read_page(&mut self, page: usize) -> MemoryResult<Vec<u8>> {
        self.check_page(page)?;
        let start = page * self.page_size;
        Ok(self.data[start..start + self.page_size].to_vec())
    }

    fn write_page(&mut self, page: usize, data: &[u8]) -> MemoryResult<()> {
        self.check_page(page)?;
        self.check_len(page, data)?;
        let start = page * self.page_size;
        self.data[start..start + self.page_size].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MemoryConfig {
        MemoryConfig::new(256, 512, 64).unwrap()
    }

    #[test]
    fn test_disk_initialization() {
        let mut disk = MemoryDisk::new(&small_config());
        assert_eq!(disk.page_count(), 8);
        assert_eq!(disk.read_page(0).unwrap(), vec![0u8; 64]);
        assert_eq!(disk.read_page(7).unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn test_disk_read_write() {
        let mut disk = MemoryDisk::new(&small_config());
        let page: Vec<u8> = (0..64).collect();
        disk.write_page(5, &page).unwrap();

        assert_eq!(disk.read_page(5).unwrap(), page);
        assert_eq!(disk.data()[5 * 64 + 3], 3);
        assert_eq!(disk.read_page(4).unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn test_disk_bounds() {
        let mut disk = MemoryDisk::new(&small_config());
        assert!(disk.read_page(8).unwrap_err().is_out_of_range());
        assert!(matches!(
            disk.write_page(0, &[1u8; 10]),
            Err(MemoryError::SizeMismatch { len: 10, available: 64, .. })
        ));
    }

    #[test]
    fn test_swap_file_create_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        let config = small_config();

        let mut swap = SwapFile::create(&path, &config).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 512);
        assert_eq!(swap.read_page(7).unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn test_swap_file_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        fs::write(&path, vec![0xFFu8; 100]).unwrap();

        let mut swap = SwapFile::create(&path, &small_config()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 512);
        assert_eq!(swap.read_page(0).unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn test_swap_file_write_does_not_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        let mut swap = SwapFile::create(&path, &small_config()).unwrap();

        swap.write_page(7, &[9u8; 64]).unwrap();
        swap.write_page(2, &[4u8; 64]).unwrap();
        assert_eq!(swap.read_page(7).unwrap(), vec![9u8; 64]);
        assert_eq!(swap.read_page(2).unwrap(), vec![4u8; 64]);
        assert_eq!(fs::metadata(&path).unwrap().len(), 512);

        assert!(swap.write_page(8, &[0u8; 64]).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_swap_file_reopen_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        let config = small_config();

        let mut swap = SwapFile::create(&path, &config).unwrap();
        swap.write_page(1, &[0x41u8; 64]).unwrap();
        drop(swap);

        let mut swap = SwapFile::open(&path, &config).unwrap();
        assert_eq!(swap.read_page(1).unwrap(), vec![0x41u8; 64]);
        assert_eq!(swap.path(), path.as_path());

        swap.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_swap_file_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(matches!(
            SwapFile::open(&path, &small_config()),
            Err(MemoryError::BackingStore { op: "open", .. })
        ));

        fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(matches!(
            SwapFile::open(&path, &small_config()),
            Err(MemoryError::BackingStore { op: "open", offset: 100, .. })
        ));
    }

    #[test]
    fn test_swap_file_truncated_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swap.bin");
        let mut swap = SwapFile::create(&path, &small_config()).unwrap();

        // shrink the file behind the handle's back
        OpenOptions::new().write(true).open(&path).unwrap().set_len(100).unwrap();

        let err = swap.read_page(3).unwrap_err();
        match err {
            MemoryError::BackingStore { op, source, .. } => {
                assert_eq!(op, "read");
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("expected BackingStore, got {:?}", other),
        }
    }
}
