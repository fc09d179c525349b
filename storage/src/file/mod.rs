// storage/src/file/mod.rs

use crate::page::{Page, PAGE_SIZE};
use crate::{Result, StorageError};
use log::{debug, trace};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Positioned page I/O over the single database file.
///
/// The file is a flat sequence of pages with no header: page `n` lives at
/// byte offset `n * PAGE_SIZE`.
pub struct PageFile {
    file: File,
    page_count: u32,
}

impl PageFile {
    /// Opens `path` for reading and writing, creating it when missing.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(StorageError::Io)?;

        let len = file.metadata().map_err(StorageError::Io)?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::CorruptFile { len });
        }

        let page_count = (len / PAGE_SIZE as u64) as u32;
        debug!("opened {} with {} pages", path.display(), page_count);

        Ok(Self { file, page_count })
    }

    /// Pages currently persisted in the file.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn read_page(&mut self, page_num: u32, page: &mut Page) -> Result<()> {
        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(StorageError::Io)?;

        self.file
            .read_exact(page.as_bytes_mut())
            .map_err(StorageError::Io)?;

        trace!("read page {} from disk", page_num);
        Ok(())
    }

    pub fn write_page(&mut self, page_num: u32, page: &Page) -> Result<()> {
        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(StorageError::Io)?;

        self.file
            .write_all(page.as_bytes())
            .map_err(StorageError::Io)?;

        // Writing past the end extends the file
        if page_num >= self.page_count {
            self.page_count = page_num + 1;
        }

        trace!("wrote page {} to disk", page_num);
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all().map_err(StorageError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let file = PageFile::open(&path).unwrap();
        assert_eq!(file.page_count(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut page = Page::new();
        page.write_u32(100, 0xDEAD_BEEF);

        {
            let mut file = PageFile::open(&path).unwrap();
            file.write_page(2, &page).unwrap();
            assert_eq!(file.page_count(), 3);
            file.sync().unwrap();
        }

        let mut file = PageFile::open(&path).unwrap();
        assert_eq!(file.page_count(), 3);

        let mut read_back = Page::new();
        file.read_page(2, &mut read_back).unwrap();
        assert_eq!(read_back.read_u32(100), 0xDEAD_BEEF);

        // The hole before page 2 reads back as zeros
        file.read_page(0, &mut read_back).unwrap();
        assert!(read_back.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_partial_page_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 17]).unwrap();

        match PageFile::open(&path) {
            Err(StorageError::CorruptFile { len }) => assert_eq!(len, PAGE_SIZE as u64 + 17),
            Err(other) => panic!("expected CorruptFile, got {other}"),
            Ok(_) => panic!("expected CorruptFile"),
        }
    }
}
