use std::path::Path;

use log::{debug, info};

use super::cursor::{Cursor, Rows};
use super::node::{
    InternalNode, LeafNode, Node, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use crate::page::TABLE_MAX_PAGES;
use crate::pager::Pager;
use crate::row::Row;
use crate::{Result, StorageError};

/// The root always lives on the first page and is never relocated.
pub const ROOT_PAGE_NUM: u32 = 0;

/// Outcome of an insert that did not hit a storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Success,
    DuplicateKey,
}

/// The single table of a database file.
pub struct Table {
    pager: Pager,
    root_page_num: u32,
}

impl Table {
    /// Opens the database at `path`, creating and formatting it when empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file: page 0 becomes an empty root leaf
            let page = pager.get_page(ROOT_PAGE_NUM)?;
            let mut root = LeafNode::initialize(ROOT_PAGE_NUM, page);
            root.page_mut().set_root(true);
            info!("initialized new database at {}", path.display());
        } else {
            info!(
                "opened database at {} ({} pages)",
                path.display(),
                pager.num_pages()
            );
        }

        Ok(Self {
            pager,
            root_page_num: ROOT_PAGE_NUM,
        })
    }

    pub fn root_page_num(&self) -> u32 {
        self.root_page_num
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub(crate) fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    /// Flushes every cached page and closes the file.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }

    /// Returns a cursor at `key`, or at the position where `key` would be
    /// inserted if it is absent.
    pub fn find(&mut self, key: u32) -> Result<Cursor> {
        let mut page_num = self.root_page_num;

        loop {
            let page = self.pager.get_page(page_num)?;
            match Node::decode(page_num, &*page)? {
                Node::Leaf(leaf) => return Ok(Cursor::new(page_num, leaf.find(key), false)),
                Node::Internal(internal) => {
                    page_num = internal.child(internal.find_child_index(key))?;
                }
            }
        }
    }

    /// Cursor at the first row in key order.
    pub fn start(&mut self) -> Result<Cursor> {
        let mut cursor = self.find(0)?;

        let page = self.pager.get_page(cursor.page_num())?;
        let leaf = Node::decode(cursor.page_num(), &*page)?.into_leaf()?;
        cursor.set_end_of_table(leaf.num_cells() == 0);

        Ok(cursor)
    }

    /// Cursor for a full ordered scan.
    pub fn scan(&mut self) -> Result<Cursor> {
        self.start()
    }

    pub fn rows(&mut self) -> Result<Rows<'_>> {
        let cursor = self.start()?;
        Ok(Rows::new(self, cursor))
    }

    pub fn insert(&mut self, key: u32, row: &Row) -> Result<InsertOutcome> {
        row.validate()?;

        let cursor = self.find(key)?;
        let page = self.pager.get_page(cursor.page_num())?;
        let mut leaf = Node::decode(cursor.page_num(), page)?.into_leaf()?;

        let num_cells = leaf.num_cells();
        if cursor.cell_num() < num_cells && leaf.key(cursor.cell_num()) == key {
            debug!("rejected duplicate key {}", key);
            return Ok(InsertOutcome::DuplicateKey);
        }

        if num_cells >= LEAF_NODE_MAX_CELLS {
            self.split_leaf_and_insert(cursor, key, row)?;
        } else {
            leaf.insert_cell(cursor.cell_num(), key, row)?;
        }

        Ok(InsertOutcome::Success)
    }

    /// Splits the full leaf under `cursor` into two and inserts the new cell
    /// into whichever half it belongs to. The upper half moves to a new page
    /// that takes the old leaf's place in the leaf chain.
    fn split_leaf_and_insert(&mut self, cursor: Cursor, key: u32, row: &Row) -> Result<()> {
        let old_page_num = cursor.page_num();

        // Only a root leaf can split: there is no path that adds a key to an
        // existing parent. Fail before touching any page.
        if !self.pager.get_page(old_page_num)?.is_root() {
            return Err(StorageError::SplitPropagationUnimplemented(old_page_num));
        }

        // A root split needs the new leaf plus a page for the old root's contents
        let new_page_num = self.pager.unused_page_num();
        if new_page_num + 1 >= TABLE_MAX_PAGES {
            return Err(StorageError::PageOutOfBounds {
                page_num: new_page_num + 1,
                max: TABLE_MAX_PAGES,
            });
        }

        {
            let (old_page, new_page) = self.pager.get_page_pair(old_page_num, new_page_num)?;
            let mut old = Node::decode(old_page_num, old_page)?.into_leaf()?;
            let mut new = LeafNode::initialize(new_page_num, new_page);

            new.page_mut().set_parent(old.page().parent());
            new.set_next_leaf(old.next_leaf());
            old.set_next_leaf(new_page_num);

            // Walk the merged sequence of old cells plus the new one from the
            // end, so every old cell is read before its slot is overwritten.
            for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
                let to_new = i >= LEAF_NODE_LEFT_SPLIT_COUNT;
                let slot = if to_new {
                    i - LEAF_NODE_LEFT_SPLIT_COUNT
                } else {
                    i
                };

                if i == cursor.cell_num() {
                    if to_new {
                        new.write_cell(slot, key, row)?;
                    } else {
                        old.write_cell(slot, key, row)?;
                    }
                    continue;
                }

                let src = if i > cursor.cell_num() { i - 1 } else { i };
                if to_new {
                    new.cell_mut(slot).copy_from_slice(old.cell(src));
                } else {
                    old.copy_cell_within(src, slot);
                }
            }

            old.set_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT);
            new.set_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT);
        }

        debug!(
            "split leaf {} at key {}, upper half moved to page {}",
            old_page_num, key, new_page_num
        );

        self.create_new_root(new_page_num)
    }

    /// Moves the current root's contents to a fresh page that becomes the
    /// left child, and turns the root page into an internal node with one
    /// key over that left child and `right_child_page_num`.
    fn create_new_root(&mut self, right_child_page_num: u32) -> Result<()> {
        let root_page_num = self.root_page_num;
        let left_child_page_num = self.pager.unused_page_num();

        {
            let (root_page, left_page) =
                self.pager.get_page_pair(root_page_num, left_child_page_num)?;

            left_page.copy_from(root_page);
            left_page.set_root(false);
            left_page.set_parent(root_page_num);
            let left_max_key = Node::decode(left_child_page_num, &*left_page)?.max_key()?;

            let mut root = InternalNode::initialize(root_page_num, root_page);
            root.page_mut().set_root(true);
            root.set_num_keys(1);
            root.set_child(0, left_child_page_num);
            root.set_key(0, left_max_key);
            root.set_right_child(right_child_page_num);
        }

        self.pager
            .get_page(right_child_page_num)?
            .set_parent(root_page_num);

        info!(
            "created new root with children {} and {}",
            left_child_page_num, right_child_page_num
        );
        Ok(())
    }
}
