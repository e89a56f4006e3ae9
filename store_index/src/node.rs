//! Holds structs for representing nodes (both internal and leaf) of the kd tree.
//!
//! Nodes live in two flat vectors owned by the tree and point at each other by position. Leaf
//! entries refer back to stores by their position in the tree's id list, never by value.

use std::fmt;

use crate::data::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePointer {
    Node(usize),
    Leaf(usize),
}

impl fmt::Display for NodePointer {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {

        match self {
            NodePointer::Node(index) => write!(f, "NODE {}", index),
            NodePointer::Leaf(index) => write!(f, "LEAF {}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    pub left_child_pointer: NodePointer,
    pub right_child_pointer: NodePointer,
    pub split_axis: usize,
    pub split_value: f64,
}

impl InternalNode {

    /// Distance from `point` to the splitting line of this node
    pub fn dist_to_axis(&self, point: &Coordinates) -> f64 {

        (point.axis(self.split_axis) - self.split_value).abs()
    }

    /// Child holding `point`, then the one left out
    pub fn children_for(&self, point: &Coordinates) -> (NodePointer, NodePointer) {

        match point.axis(self.split_axis) <= self.split_value {
            true => (self.left_child_pointer, self.right_child_pointer),
            false => (self.right_child_pointer, self.left_child_pointer),
        }
    }

    pub fn pretty(&self) -> String {

        format!("SA: {} SV: {} LC: {} RC: {}",
                self.split_axis,
                self.split_value,
                self.left_child_pointer,
                self.right_child_pointer)
    }
}

/// A point stored in a leaf, with the position of its store in the tree's id list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeRecord {
    pub index: usize,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeafPage {
    pub records: Vec<TreeRecord>,
}

impl LeafPage {

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn children_follow_split() {

        let node = InternalNode {
            left_child_pointer: NodePointer::Leaf(0),
            right_child_pointer: NodePointer::Leaf(1),
            split_axis: 1,
            split_value: 2.0,
        };

        let on_line = Coordinates::new(10.0, 2.0);
        assert_eq!(node.children_for(&on_line), (NodePointer::Leaf(0), NodePointer::Leaf(1)));

        let right = Coordinates::new(-10.0, 2.5);
        assert_eq!(node.children_for(&right), (NodePointer::Leaf(1), NodePointer::Leaf(0)));
        assert_eq!(node.dist_to_axis(&right), 0.5);
    }

    #[test]
    fn pointer_display() {

        assert_eq!(NodePointer::Node(3).to_string(), "NODE 3");
        assert_eq!(NodePointer::Leaf(7).to_string(), "LEAF 7");
    }
}
