// storage/src/pager/mod.rs

use crate::file::PageFile;
use crate::page::{Page, TABLE_MAX_PAGES};
use crate::{Result, StorageError};
use log::{debug, info};
use std::path::Path;

/// Write-back page cache and sole owner of the database file.
///
/// Pages are loaded lazily on first access and stay cached for the lifetime
/// of the pager; nothing reaches the disk until [`Pager::flush`] or
/// [`Pager::close`].
pub struct Pager {
    file: PageFile,
    num_pages: u32,
    pages: Vec<Option<Box<Page>>>,
}

impl Pager {
    pub fn open(path: &Path) -> Result<Self> {
        let file = PageFile::open(path)?;
        let num_pages = file.page_count();
        if num_pages > TABLE_MAX_PAGES {
            return Err(StorageError::PageOutOfBounds {
                page_num: num_pages - 1,
                max: TABLE_MAX_PAGES,
            });
        }

        Ok(Self {
            file,
            num_pages,
            pages: (0..TABLE_MAX_PAGES).map(|_| None).collect(),
        })
    }

    /// Pages known to exist, on disk or only in the cache.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Page number the next allocation will use. Pages are never recycled,
    /// so new pages always go at the end of the file.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Page> {
        self.load(page_num)?;
        self.pages[page_num as usize]
            .as_deref_mut()
            .ok_or(StorageError::PageNotCached(page_num))
    }

    /// Borrows two distinct pages mutably at the same time.
    pub fn get_page_pair(&mut self, first: u32, second: u32) -> Result<(&mut Page, &mut Page)> {
        if first == second {
            return Err(StorageError::PageAliased(first));
        }

        self.load(first)?;
        self.load(second)?;

        let (low, high) = (first.min(second), first.max(second));
        let (head, tail) = self.pages.split_at_mut(high as usize);
        let low_page = head[low as usize]
            .as_deref_mut()
            .ok_or(StorageError::PageNotCached(low))?;
        let high_page = tail[0]
            .as_deref_mut()
            .ok_or(StorageError::PageNotCached(high))?;

        if first < second {
            Ok((low_page, high_page))
        } else {
            Ok((high_page, low_page))
        }
    }

    pub fn flush(&mut self, page_num: u32) -> Result<()> {
        let page = self
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.as_deref())
            .ok_or(StorageError::PageNotCached(page_num))?;

        self.file.write_page(page_num, page)
    }

    /// Flushes every cached page in page-number order and closes the file.
    pub fn close(mut self) -> Result<()> {
        let mut flushed = 0;
        for (page_num, slot) in self.pages.iter().enumerate() {
            if let Some(page) = slot {
                self.file.write_page(page_num as u32, page)?;
                flushed += 1;
            }
        }

        self.file.sync()?;
        info!("closed database after flushing {} pages", flushed);
        Ok(())
    }

    fn load(&mut self, page_num: u32) -> Result<()> {
        if page_num >= TABLE_MAX_PAGES {
            return Err(StorageError::PageOutOfBounds {
                page_num,
                max: TABLE_MAX_PAGES,
            });
        }

        let slot = &mut self.pages[page_num as usize];
        if slot.is_none() {
            let mut page = Page::new();
            // Pages past the end of the file start out zeroed
            if page_num < self.file.page_count() {
                self.file.read_page(page_num, &mut page)?;
            }
            *slot = Some(page);
            debug!("cached page {}", page_num);
        }

        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        Ok(())
    }
}
