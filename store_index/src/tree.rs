//! Implementation of kd-tree creation and querying over store coordinates
use std::cmp::Ordering;
use std::collections::VecDeque;

use log::debug;
use serde::Serialize;

use crate::data::{Coordinates, EntityId};
use crate::error::{Error, Result};
use crate::node::{InternalNode, LeafPage, NodePointer, TreeRecord};

pub const DIMENSIONS: usize = 2;

/// One result of a nearest neighbor query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub entity_id: EntityId,
    pub distance: f64,
}

///struct for keeping N- top closest points
///
///handles distance sorting and truncating to N items. Equal distances put the `preferred` store
///first, then go by store position, so results don't depend on traversal order.
#[derive(Debug)]
pub struct TopHits {
    pub max_length: usize,
    pub preferred: Option<usize>,
    pub hits: Vec<(f64, usize)>,
}

impl TopHits {

    pub fn new(max_length: usize) -> Self {

        return Self {
            max_length,
            preferred: None,
            hits: Vec::with_capacity(max_length + 1),
        }
    }

    pub fn with_preferred(max_length: usize, preferred: usize) -> Self {

        let mut hits = Self::new(max_length);
        hits.preferred = Some(preferred);

        return hits;
    }

    fn cmp_hit(&self, a: &(f64, usize), b: &(f64, usize)) -> Ordering {

        let a_other = Some(a.1) != self.preferred;
        let b_other = Some(b.1) != self.preferred;

        a.0.total_cmp(&b.0)
            .then(a_other.cmp(&b_other))
            .then(a.1.cmp(&b.1))
    }

    ///Public method to be called on every record for consideration as a neighbor
    pub fn try_add(&mut self, distance: f64, index: usize) {

        if self.max_length == 0 {
            return;
        }

        let candidate = (distance, index);

        if self.is_full() {
            let worst = &self.hits[self.max_length - 1];
            if self.cmp_hit(&candidate, worst) != Ordering::Less {
                return;
            }
        }

        let insert_index = self.hits.partition_point(|x| self.cmp_hit(x, &candidate) == Ordering::Less);
        self.hits.insert(insert_index, candidate);
        self.hits.truncate(self.max_length);
    }

    pub fn is_full(&self) -> bool {
        self.hits.len() >= self.max_length
    }

    ///# Returns
    ///
    ///the highest distance kept so far, or infinity while fewer than `max_length` points were seen
    pub fn get_highest_dist(&self) -> f64 {

        match self.is_full() {
            true => self.hits[self.max_length - 1].0,
            false => f64::INFINITY,
        }
    }
}

#[derive(Debug)]
pub enum NodeAction {
    CheckIgnoredBranch(NodePointer),
    Descend,
}

/// Balanced kd tree over store coordinates.
///
/// Built once, then only read. Internal nodes split at the median of alternating axes (latitude,
/// then longitude); buckets of at most `leaf_size` points sit at the leaves.
#[derive(Debug)]
pub struct KdTree {
    ids: Vec<EntityId>,
    nodes: Vec<InternalNode>,
    leaves: Vec<LeafPage>,
    root: Option<NodePointer>,
    leaf_size: usize,
}

impl KdTree {

    pub fn build<I>(entities: I, leaf_size: usize) -> Self
    where I: IntoIterator<Item = (EntityId, Coordinates)> {

        let (ids, points): (Vec<EntityId>, Vec<Coordinates>) = entities.into_iter().unzip();

        let mut tree = Self {
            ids,
            nodes: Vec::new(),
            leaves: Vec::new(),
            root: None,
            leaf_size: leaf_size.max(1),
        };

        if points.is_empty() {
            return tree;
        }

        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = tree.build_subtree(&points, &mut indices, 0);
        tree.root = Some(root);

        debug!("kd tree built: {} points, {} nodes, {} leaves, depth {}",
               tree.len(), tree.nodes.len(), tree.leaves.len(), tree.depth());

        return tree;
    }

    ///Splits `indices` at the median along the axis for `depth` and recurses into both halves.
    ///Ties on the split value may land on either side, which the query accounts for.
    fn build_subtree(&mut self, points: &[Coordinates], indices: &mut [usize], depth: usize) -> NodePointer {

        if indices.len() <= self.leaf_size {

            let records = indices
                .iter()
                .map(|i| TreeRecord { index: *i, coordinates: points[*i] })
                .collect();

            self.leaves.push(LeafPage { records });
            return NodePointer::Leaf(self.leaves.len() - 1);
        }

        let split_axis = depth % DIMENSIONS;
        let mid = indices.len() / 2;

        indices.select_nth_unstable_by(mid, |a, b| {
            points[*a].axis(split_axis)
                .total_cmp(&points[*b].axis(split_axis))
                .then(a.cmp(b))
        });

        let split_value = points[indices[mid]].axis(split_axis);

        //reserve our slot before the children take theirs
        let position = self.nodes.len();
        self.nodes.push(InternalNode {
            left_child_pointer: NodePointer::Leaf(0),
            right_child_pointer: NodePointer::Leaf(0),
            split_axis,
            split_value,
        });

        let (left, right) = indices.split_at_mut(mid);
        let left_child_pointer = self.build_subtree(points, left, depth + 1);
        let right_child_pointer = self.build_subtree(points, right, depth + 1);

        let node = &mut self.nodes[position];
        node.left_child_pointer = left_child_pointer;
        node.right_child_pointer = right_child_pointer;

        return NodePointer::Node(position);
    }

    ///Returns the `k` nearest stores to `point`, closest first.
    ///
    ///A store sitting exactly at `point` is returned like any other, so querying with a store's
    ///own coordinates yields that store first.
    pub fn query(&self, point: &Coordinates, k: i64) -> Result<Vec<Neighbor>> {

        self.query_hits(point, k, None)
    }

    ///Same as [`KdTree::query`], except that the store built at position `preferred` comes first
    ///among stores at the same distance. Used for a store's own neighbor query, so a store sharing
    ///its coordinates with an earlier one still finds itself.
    pub fn query_with_preferred(&self, point: &Coordinates, k: i64, preferred: usize) -> Result<Vec<Neighbor>> {

        self.query_hits(point, k, Some(preferred))
    }

    fn query_hits(&self, point: &Coordinates, k: i64, preferred: Option<usize>) -> Result<Vec<Neighbor>> {

        if k <= 0 {
            return Err(Error::InvalidK(k));
        }

        let n = usize::try_from(k).unwrap_or(usize::MAX).min(self.len());

        let hits = match preferred {
            Some(x) => TopHits::with_preferred(n, x),
            None => TopHits::new(n),
        };
        let top_hits = self.get_top_hits(point, hits);

        let neighbors = top_hits.hits
            .into_iter()
            .map(|(distance, index)| Neighbor { entity_id: self.ids[index].clone(), distance })
            .collect();

        return Ok(neighbors);
    }

    fn get_top_hits(&self, point: &Coordinates, mut hits: TopHits) -> TopHits {

        let root = match self.root {
            Some(x) if hits.max_length > 0 => x,
            _ => return hits,
        };

        let mut num_nodes_visited: usize = 0;
        let mut num_leaves_visited: usize = 0;

        let mut nodes_to_check: VecDeque<(NodePointer, NodeAction)> = VecDeque::new();
        nodes_to_check.push_front((root, NodeAction::Descend));

        while let Some((curr_pointer, action)) = nodes_to_check.pop_front() {

            match action {

                NodeAction::Descend => {

                    match curr_pointer {
                        NodePointer::Leaf(index) => {

                            num_leaves_visited += 1;

                            for record in self.leaves[index].records.iter() {
                                hits.try_add(point.distance(&record.coordinates), record.index);
                            }
                        },
                        NodePointer::Node(index) => {

                            num_nodes_visited += 1;

                            let (descend_pointer, ignored_pointer) = self.nodes[index].children_for(point);

                            //go down first, come back to the other side once we have a radius
                            nodes_to_check.push_front((descend_pointer, NodeAction::Descend));
                            nodes_to_check.push_back((curr_pointer, NodeAction::CheckIgnoredBranch(ignored_pointer)));
                        },
                    }
                },

                NodeAction::CheckIgnoredBranch(ignored_pointer) => {

                    let node_index = match curr_pointer {
                        NodePointer::Node(x) => x,
                        NodePointer::Leaf(_) => continue,
                    };

                    let dist = self.nodes[node_index].dist_to_axis(point);

                    //equal counts too, a tied point there may win on preference or store order
                    if dist <= hits.get_highest_dist() {
                        nodes_to_check.push_front((ignored_pointer, NodeAction::Descend));
                    }
                },
            }
        }

        debug!("query visited {} nodes and {} leaves", num_nodes_visited, num_leaves_visited);

        return hits;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Number of levels from the root down to the deepest leaf, zero for an empty tree
    pub fn depth(&self) -> usize {

        let root = match self.root {
            None => return 0,
            Some(x) => x,
        };

        let mut max_depth = 0;
        let mut to_visit: Vec<(NodePointer, usize)> = vec![(root, 1)];

        while let Some((pointer, depth)) = to_visit.pop() {
            match pointer {
                NodePointer::Leaf(_) => max_depth = max_depth.max(depth),
                NodePointer::Node(index) => {
                    let node = &self.nodes[index];
                    to_visit.push((node.left_child_pointer, depth + 1));
                    to_visit.push((node.right_child_pointer, depth + 1));
                },
            }
        }

        return max_depth;
    }

    /// One line per node and leaf, depth first, indented by level
    pub fn describe(&self) -> Vec<String> {

        let mut lines: Vec<String> = Vec::new();

        let mut to_visit: Vec<(NodePointer, usize)> = match self.root {
            None => return lines,
            Some(x) => vec![(x, 0)],
        };

        while let Some((pointer, depth)) = to_visit.pop() {

            let indent = "  ".repeat(depth);

            match pointer {
                NodePointer::Leaf(index) => {
                    let ids: Vec<&str> = self.leaves[index].records.iter().map(|r| self.ids[r.index].as_str()).collect();
                    lines.push(format!("{}{}: {}", indent, pointer, ids.join(",")));
                },
                NodePointer::Node(index) => {
                    let node = &self.nodes[index];
                    lines.push(format!("{}{}: {}", indent, pointer, node.pretty()));
                    to_visit.push((node.right_child_pointer, depth + 1));
                    to_visit.push((node.left_child_pointer, depth + 1));
                },
            }
        }

        return lines;
    }
}
