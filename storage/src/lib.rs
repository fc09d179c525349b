//! Storage engine for the pagedb database
//!
//! This crate provides the on-disk primitives of a single-table database:
//! fixed-size pages, a write-back page cache over one backing file, and a
//! B-tree keyed by `u32` whose leaves are chained for ordered scans.

pub mod btree;
pub mod file;
pub mod page;
pub mod pager;
pub mod row;

pub use btree::{Constants, Cursor, InsertOutcome, Node, Rows, Table};
pub use file::PageFile;
pub use page::{NodeHeader, NodeType, Page, PAGE_SIZE, TABLE_MAX_PAGES};
pub use pager::Pager;
pub use row::{Row, ROW_SIZE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Db file is not a whole number of pages ({len} bytes). Corrupt file.")]
    CorruptFile { len: u64 },

    #[error("Tried to fetch page number out of bounds: {page_num} >= {max}")]
    PageOutOfBounds { page_num: u32, max: u32 },

    #[error("Tried to flush page {0}, which is not cached")]
    PageNotCached(u32),

    #[error("Tried to borrow page {0} twice at once")]
    PageAliased(u32),

    #[error("Page {page_num} holds {count} entries, more than the {max} that fit")]
    CorruptNode {
        page_num: u32,
        count: usize,
        max: usize,
    },

    #[error("Page {page_num} has unknown node type byte {byte:#04x}")]
    InvalidNodeType { page_num: u32, byte: u8 },

    #[error("Tried to access child {child_num} > num_keys {num_keys}")]
    ChildOutOfRange { child_num: u32, num_keys: u32 },

    #[error("Page {0} is an internal node, expected a leaf")]
    NotALeaf(u32),

    #[error("Cell {cell_num} is past the end of leaf page {page_num} ({num_cells} cells)")]
    CellOutOfRange {
        page_num: u32,
        cell_num: usize,
        num_cells: usize,
    },

    #[error("Node on page {0} has no keys")]
    EmptyNode(u32),

    #[error("Need to implement updating parent after split (leaf page {0} is not the root)")]
    SplitPropagationUnimplemented(u32),

    #[error("Field {field} is too long: {actual} bytes, at most {max} allowed")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
