//! Typed views over the byte layout of B-tree pages.
//!
//! ```text
//! common header   [0] node type  [1] is root  [2..6] parent page
//! leaf header     [6..10] num_cells  [10..14] next_leaf (0 = rightmost)
//! leaf cell i     [14 + i*297 ..] key (4) + row (293)
//! internal header [6..10] num_keys   [10..14] right_child
//! internal cell i [14 + i*8 ..]   child (4) + key (4)
//! ```

use std::ops::{Deref, DerefMut};

use crate::page::{NodeHeader, NodeType, Page, COMMON_NODE_HEADER_SIZE, PAGE_SIZE};
use crate::row::{Row, ROW_SIZE};
use crate::{Result, StorageError};

/*
 * Leaf node header layout
 */
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NEXT_LEAF_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

/*
 * Leaf node body layout
 */
pub const LEAF_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1).div_ceil(2);
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

/*
 * Internal node header layout
 */
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

/*
 * Internal node body layout
 */
pub const INTERNAL_NODE_CHILD_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_MAX_CELLS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

fn leaf_node_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

fn internal_node_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

/// A page decoded by its node type byte.
///
/// `P` is any borrow of a page, so the same view works for read-only
/// traversal (`&Page`) and for mutation (`&mut Page`).
pub enum Node<P> {
    Leaf(LeafNode<P>),
    Internal(InternalNode<P>),
}

impl<P: Deref<Target = Page>> Node<P> {
    /// Decodes the node type and rejects cell counts that cannot fit in a
    /// page, so later cell accesses stay inside the buffer.
    pub fn decode(page_num: u32, page: P) -> Result<Self> {
        let NodeHeader { node_type, .. } = page.header(page_num)?;
        let (node, count, max) = match node_type {
            NodeType::Leaf => {
                let leaf = LeafNode { page_num, page };
                let count = leaf.num_cells();
                (Node::Leaf(leaf), count, LEAF_NODE_MAX_CELLS)
            }
            NodeType::Internal => {
                let internal = InternalNode { page_num, page };
                let count = internal.num_keys();
                (Node::Internal(internal), count, INTERNAL_NODE_MAX_CELLS)
            }
        };

        if count > max {
            return Err(StorageError::CorruptNode {
                page_num,
                count,
                max,
            });
        }
        Ok(node)
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Leaf(_) => NodeType::Leaf,
            Node::Internal(_) => NodeType::Internal,
        }
    }

    pub fn page_num(&self) -> u32 {
        match self {
            Node::Leaf(leaf) => leaf.page_num,
            Node::Internal(internal) => internal.page_num,
        }
    }

    /// Largest key stored in the node itself, read from its last cell.
    pub fn max_key(&self) -> Result<u32> {
        match self {
            Node::Leaf(leaf) => leaf.max_key(),
            Node::Internal(internal) => internal.max_key(),
        }
    }

    pub fn into_leaf(self) -> Result<LeafNode<P>> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(internal) => Err(StorageError::NotALeaf(internal.page_num)),
        }
    }
}

pub struct LeafNode<P> {
    page_num: u32,
    page: P,
}

impl<P: Deref<Target = Page>> LeafNode<P> {
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn num_cells(&self) -> usize {
        self.page.read_u32(LEAF_NODE_NUM_CELLS_OFFSET) as usize
    }

    /// Page number of the next leaf in key order, or 0 for the rightmost leaf.
    pub fn next_leaf(&self) -> u32 {
        self.page.read_u32(LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    pub fn cell(&self, cell_num: usize) -> &[u8] {
        self.page
            .slice(leaf_node_cell_offset(cell_num), LEAF_NODE_CELL_SIZE)
    }

    pub fn key(&self, cell_num: usize) -> u32 {
        self.page
            .read_u32(leaf_node_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
    }

    pub fn value(&self, cell_num: usize) -> &[u8] {
        self.page.slice(
            leaf_node_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET,
            LEAF_NODE_VALUE_SIZE,
        )
    }

    pub fn row(&self, cell_num: usize) -> Result<Row> {
        Row::deserialize(self.value(cell_num))
    }

    pub fn max_key(&self) -> Result<u32> {
        match self.num_cells() {
            0 => Err(StorageError::EmptyNode(self.page_num)),
            n => Ok(self.key(n - 1)),
        }
    }

    /// Binary search for `key`. Returns the index of the matching cell, or
    /// the index where the key would have to be inserted to keep order.
    pub fn find(&self, key: u32) -> usize {
        let mut min_index = 0;
        let mut one_past_max_index = self.num_cells();

        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = self.key(index);
            if key == key_at_index {
                return index;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        min_index
    }
}

impl<P: DerefMut<Target = Page>> LeafNode<P> {
    /// Formats `page` as an empty, non-root leaf.
    pub fn initialize(page_num: u32, mut page: P) -> Self {
        page.set_node_type(NodeType::Leaf);
        page.set_root(false);
        let mut leaf = Self { page_num, page };
        leaf.set_num_cells(0);
        leaf.set_next_leaf(0);
        leaf
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn set_num_cells(&mut self, num_cells: usize) {
        self.page
            .write_u32(LEAF_NODE_NUM_CELLS_OFFSET, num_cells as u32);
    }

    pub fn set_next_leaf(&mut self, next_leaf: u32) {
        self.page.write_u32(LEAF_NODE_NEXT_LEAF_OFFSET, next_leaf);
    }

    pub fn cell_mut(&mut self, cell_num: usize) -> &mut [u8] {
        self.page
            .slice_mut(leaf_node_cell_offset(cell_num), LEAF_NODE_CELL_SIZE)
    }

    /// Writes `key` and the encoded `row` into slot `cell_num`.
    pub fn write_cell(&mut self, cell_num: usize, key: u32, row: &Row) -> Result<()> {
        let offset = leaf_node_cell_offset(cell_num);
        row.serialize(
            self.page
                .slice_mut(offset + LEAF_NODE_VALUE_OFFSET, LEAF_NODE_VALUE_SIZE),
        )?;
        self.page.write_u32(offset + LEAF_NODE_KEY_OFFSET, key);
        Ok(())
    }

    pub fn copy_cell_within(&mut self, from: usize, to: usize) {
        let src = leaf_node_cell_offset(from);
        self.page
            .copy_within(src..src + LEAF_NODE_CELL_SIZE, leaf_node_cell_offset(to));
    }

    /// Inserts a cell at `cell_num`, shifting later cells one slot right.
    /// The caller guarantees the leaf has a free slot.
    pub fn insert_cell(&mut self, cell_num: usize, key: u32, row: &Row) -> Result<()> {
        let num_cells = self.num_cells();
        debug_assert!(num_cells < LEAF_NODE_MAX_CELLS);

        if cell_num < num_cells {
            self.page.copy_within(
                leaf_node_cell_offset(cell_num)..leaf_node_cell_offset(num_cells),
                leaf_node_cell_offset(cell_num + 1),
            );
        }

        self.write_cell(cell_num, key, row)?;
        self.set_num_cells(num_cells + 1);
        Ok(())
    }
}

pub struct InternalNode<P> {
    page_num: u32,
    page: P,
}

impl<P: Deref<Target = Page>> InternalNode<P> {
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn num_keys(&self) -> usize {
        self.page.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET) as usize
    }

    pub fn right_child(&self) -> u32 {
        self.page.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    /// Child `child_num`; index `num_keys` is the right child.
    pub fn child(&self, child_num: usize) -> Result<u32> {
        let num_keys = self.num_keys();
        match child_num.cmp(&num_keys) {
            std::cmp::Ordering::Less => {
                Ok(self.page.read_u32(internal_node_cell_offset(child_num)))
            }
            std::cmp::Ordering::Equal => Ok(self.right_child()),
            std::cmp::Ordering::Greater => Err(StorageError::ChildOutOfRange {
                child_num: child_num as u32,
                num_keys: num_keys as u32,
            }),
        }
    }

    pub fn key(&self, key_num: usize) -> u32 {
        self.page
            .read_u32(internal_node_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE)
    }

    pub fn max_key(&self) -> Result<u32> {
        match self.num_keys() {
            0 => Err(StorageError::EmptyNode(self.page_num)),
            n => Ok(self.key(n - 1)),
        }
    }

    /// Index of the child whose subtree should contain `key`: the first
    /// stored key that is not less than `key`, or the right child.
    pub fn find_child_index(&self, key: u32) -> usize {
        let mut min_index = 0;
        let mut max_index = self.num_keys();

        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = self.key(index);
            if key_to_right >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        min_index
    }
}

impl<P: DerefMut<Target = Page>> InternalNode<P> {
    /// Formats `page` as an empty, non-root internal node.
    pub fn initialize(page_num: u32, mut page: P) -> Self {
        page.set_node_type(NodeType::Internal);
        page.set_root(false);
        let mut internal = Self { page_num, page };
        internal.set_num_keys(0);
        internal
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn set_num_keys(&mut self, num_keys: usize) {
        self.page
            .write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys as u32);
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        self.page
            .write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
    }

    /// Sets the child pointer stored in cell `cell_num`.
    pub fn set_child(&mut self, cell_num: usize, page_num: u32) {
        self.page
            .write_u32(internal_node_cell_offset(cell_num), page_num);
    }

    pub fn set_key(&mut self, key_num: usize, key: u32) {
        self.page.write_u32(
            internal_node_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE,
            key,
        );
    }
}
