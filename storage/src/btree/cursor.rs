use super::node::{LeafNode, Node};
use super::table::Table;
use crate::page::Page;
use crate::row::Row;
use crate::{Result, StorageError};

/// A position in the leaf chain.
///
/// Cursors are plain values and hold no borrow of the table, so every
/// operation that reads page data takes the table explicitly. Any insert
/// invalidates outstanding cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    page_num: u32,
    cell_num: usize,
    end_of_table: bool,
}

impl Cursor {
    pub(crate) fn new(page_num: u32, cell_num: usize, end_of_table: bool) -> Self {
        Self {
            page_num,
            cell_num,
            end_of_table,
        }
    }

    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn cell_num(&self) -> usize {
        self.cell_num
    }

    /// True once the cursor has moved past the last row of the rightmost leaf.
    pub fn at_end(&self) -> bool {
        self.end_of_table
    }

    pub(crate) fn set_end_of_table(&mut self, end_of_table: bool) {
        self.end_of_table = end_of_table;
    }

    pub fn key(&self, table: &mut Table) -> Result<u32> {
        let page = table.pager_mut().get_page(self.page_num)?;
        let leaf = self.leaf(page)?;
        Ok(leaf.key(self.cell_num))
    }

    pub fn value(&self, table: &mut Table) -> Result<Row> {
        let page = table.pager_mut().get_page(self.page_num)?;
        let leaf = self.leaf(page)?;
        leaf.row(self.cell_num)
    }

    pub fn advance(&mut self, table: &mut Table) -> Result<()> {
        let page = table.pager_mut().get_page(self.page_num)?;
        let leaf = Node::decode(self.page_num, &*page)?.into_leaf()?;

        self.cell_num += 1;
        if self.cell_num >= leaf.num_cells() {
            match leaf.next_leaf() {
                // This was the rightmost leaf
                0 => self.end_of_table = true,
                next_page_num => {
                    self.page_num = next_page_num;
                    self.cell_num = 0;
                }
            }
        }

        Ok(())
    }

    fn leaf<'p>(&self, page: &'p Page) -> Result<LeafNode<&'p Page>> {
        let leaf = Node::decode(self.page_num, page)?.into_leaf()?;
        if self.cell_num >= leaf.num_cells() {
            return Err(StorageError::CellOutOfRange {
                page_num: self.page_num,
                cell_num: self.cell_num,
                num_cells: leaf.num_cells(),
            });
        }
        Ok(leaf)
    }
}

/// Iterator over every row of a table in key order.
pub struct Rows<'a> {
    table: &'a mut Table,
    cursor: Cursor,
    done: bool,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(table: &'a mut Table, cursor: Cursor) -> Self {
        Self {
            table,
            cursor,
            done: false,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.at_end() {
            return None;
        }

        let row = self
            .cursor
            .value(self.table)
            .and_then(|row| self.cursor.advance(self.table).map(|()| row));

        if row.is_err() {
            self.done = true;
        }
        Some(row)
    }
}
