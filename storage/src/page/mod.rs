use std::ops::Range;

use bytes::{Buf, BufMut};

use crate::{Result, StorageError};

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: u32 = 100;

/*
 * Common node header layout, shared by leaf and internal pages
 */
pub const NODE_TYPE_SIZE: usize = std::mem::size_of::<u8>();
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = std::mem::size_of::<u8>();
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = std::mem::size_of::<u32>();
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

#[repr(u8)] // 1 byte on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

impl TryFrom<u8> for NodeType {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        match byte {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            other => Err(other),
        }
    }
}

/// Decoded copy of the fields every node starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub node_type: NodeType, // 1 byte
    pub is_root: bool,       // 1 byte
    pub parent: u32,         // 4 bytes - page number of the parent node
}

/// One fixed-size block of the database file.
///
/// All multi-byte integers inside a page are stored big-endian.
#[derive(Clone)]
#[repr(C, align(8))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// A zero-filled page.
    pub fn new() -> Box<Self> {
        Box::new(Self {
            data: [0; PAGE_SIZE],
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrites this page with the full contents of `other`.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut src = &self.data[offset..offset + 4];
        src.get_u32()
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        let mut dst = &mut self.data[offset..offset + 4];
        dst.put_u32(value);
    }

    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.data[offset..offset + len]
    }

    /// Moves `src` within the page so it starts at `dest`; the ranges may overlap.
    pub fn copy_within(&mut self, src: Range<usize>, dest: usize) {
        self.data.copy_within(src, dest);
    }

    /// Decodes the common node header. `page_num` is only used for error context.
    pub fn header(&self, page_num: u32) -> Result<NodeHeader> {
        let byte = self.read_u8(NODE_TYPE_OFFSET);
        let node_type = NodeType::try_from(byte)
            .map_err(|byte| StorageError::InvalidNodeType { page_num, byte })?;

        Ok(NodeHeader {
            node_type,
            is_root: self.is_root(),
            parent: self.parent(),
        })
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.write_u8(NODE_TYPE_OFFSET, node_type as u8);
    }

    pub fn is_root(&self) -> bool {
        self.read_u8(IS_ROOT_OFFSET) != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.write_u8(IS_ROOT_OFFSET, u8::from(is_root));
    }

    pub fn parent(&self) -> u32 {
        self.read_u32(PARENT_POINTER_OFFSET)
    }

    pub fn set_parent(&mut self, parent: u32) {
        self.write_u32(PARENT_POINTER_OFFSET, parent);
    }
}
