//! B-tree over pager pages, keyed by `u32`.
//!
//! Page 0 is always the root. Leaves hold the rows and are chained through
//! `next_leaf` in ascending key order; internal nodes hold separator keys
//! equal to the largest key of the subtree on their left.

mod cursor;
mod diagnostics;
pub mod node;
mod table;

pub use cursor::{Cursor, Rows};
pub use diagnostics::Constants;
pub use node::{InternalNode, LeafNode, Node};
pub use table::{InsertOutcome, Table, ROOT_PAGE_NUM};
