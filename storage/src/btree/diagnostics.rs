use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::node::{
    Node, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use super::table::Table;
use crate::page::COMMON_NODE_HEADER_SIZE;
use crate::row::ROW_SIZE;
use crate::Result;

/// Snapshot of the layout constants, for operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constants {
    pub row_size: usize,
    pub common_node_header_size: usize,
    pub leaf_node_header_size: usize,
    pub leaf_node_cell_size: usize,
    pub leaf_node_space_for_cells: usize,
    pub leaf_node_max_cells: usize,
}

impl Constants {
    pub const fn current() -> Self {
        Self {
            row_size: ROW_SIZE,
            common_node_header_size: COMMON_NODE_HEADER_SIZE,
            leaf_node_header_size: LEAF_NODE_HEADER_SIZE,
            leaf_node_cell_size: LEAF_NODE_CELL_SIZE,
            leaf_node_space_for_cells: LEAF_NODE_SPACE_FOR_CELLS,
            leaf_node_max_cells: LEAF_NODE_MAX_CELLS,
        }
    }
}

impl fmt::Display for Constants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROW_SIZE: {}", self.row_size)?;
        writeln!(f, "COMMON_NODE_HEADER_SIZE: {}", self.common_node_header_size)?;
        writeln!(f, "LEAF_NODE_HEADER_SIZE: {}", self.leaf_node_header_size)?;
        writeln!(f, "LEAF_NODE_CELL_SIZE: {}", self.leaf_node_cell_size)?;
        writeln!(f, "LEAF_NODE_SPACE_FOR_CELLS: {}", self.leaf_node_space_for_cells)?;
        writeln!(f, "LEAF_NODE_MAX_CELLS: {}", self.leaf_node_max_cells)
    }
}

enum Visit {
    Leaf(Vec<u32>),
    Internal { children: Vec<u32>, keys: Vec<u32> },
}

impl Table {
    /// Renders the tree as an indented outline, two spaces per level.
    pub fn dump_tree(&mut self) -> Result<String> {
        let mut out = String::new();
        let root = self.root_page_num();
        self.dump_node(root, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&mut self, page_num: u32, level: usize, out: &mut String) -> Result<()> {
        // Copy what we need out of the page so the pager is free for the children
        let visit = {
            let page = self.pager_mut().get_page(page_num)?;
            match Node::decode(page_num, &*page)? {
                Node::Leaf(leaf) => Visit::Leaf((0..leaf.num_cells()).map(|i| leaf.key(i)).collect()),
                Node::Internal(internal) => {
                    let num_keys = internal.num_keys();
                    Visit::Internal {
                        children: (0..=num_keys)
                            .map(|i| internal.child(i))
                            .collect::<Result<_>>()?,
                        keys: (0..num_keys).map(|i| internal.key(i)).collect(),
                    }
                }
            }
        };

        let indent = level * 2;
        match visit {
            Visit::Leaf(keys) => {
                out.push_str(&format!("{:indent$}- leaf (size {})\n", "", keys.len()));
                for key in keys {
                    out.push_str(&format!("{:width$}- {}\n", "", key, width = indent + 2));
                }
            }
            Visit::Internal { children, keys } => {
                out.push_str(&format!("{:indent$}- internal (size {})\n", "", keys.len()));
                for (child, key) in children.iter().zip(&keys) {
                    self.dump_node(*child, level + 1, out)?;
                    out.push_str(&format!("{:width$}- key {}\n", "", key, width = indent + 2));
                }
                if let Some(&right_child) = children.last() {
                    self.dump_node(right_child, level + 1, out)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn row_for(key: u32) -> Row {
        Row::new(key, format!("user{key}"), format!("person{key}@example.com")).unwrap()
    }

    #[test]
    fn test_constants_dump() {
        let expected = "\
ROW_SIZE: 293
COMMON_NODE_HEADER_SIZE: 6
LEAF_NODE_HEADER_SIZE: 14
LEAF_NODE_CELL_SIZE: 297
LEAF_NODE_SPACE_FOR_CELLS: 4082
LEAF_NODE_MAX_CELLS: 13
";
        assert_eq!(Constants::current().to_string(), expected);
    }

    #[test]
    fn test_dump_single_leaf() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        for key in [3, 1, 2] {
            table.insert(key, &row_for(key)).unwrap();
        }

        assert_eq!(
            table.dump_tree().unwrap(),
            "- leaf (size 3)\n  - 1\n  - 2\n  - 3\n"
        );
    }

    #[test]
    fn test_dump_after_split() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("test.db")).unwrap();
        for key in 1..=14 {
            table.insert(key, &row_for(key)).unwrap();
        }

        let mut expected = String::from("- internal (size 1)\n  - leaf (size 7)\n");
        for key in 1..=7 {
            expected.push_str(&format!("    - {key}\n"));
        }
        expected.push_str("  - key 7\n  - leaf (size 7)\n");
        for key in 8..=14 {
            expected.push_str(&format!("    - {key}\n"));
        }

        assert_eq!(table.dump_tree().unwrap(), expected);
    }
}
