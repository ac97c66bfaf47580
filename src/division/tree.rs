//! Criteria tree stored as a petgraph arena.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsPostOrder, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One node of a division tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalCell {
    /// Criterion parameters for this branch.
    pub values: serde_json::Value,
    /// First grid row the node occupies, as decoded.
    pub row_index: usize,
    /// Grid column, equal to the node's depth.
    pub col_index: usize,
}

/// Ordered forest of [`HierarchicalCell`]s.
///
/// Nodes live in a `DiGraph` with parent → child edges; sibling order is
/// edge insertion order. Traversals are iterative so deep hierarchies do not
/// grow the call stack.
///
/// # Examples
///
/// ```rust
/// use scorepipe::division::tree::DivisionTree;
/// use serde_json::json;
///
/// let mut tree = DivisionTree::new();
/// let root = tree.add_root(json!({"year": 2020}));
/// tree.add_child(root, json!({"grade": "3"}));
/// tree.add_child(root, json!({"grade": "2"}));
///
/// assert_eq!(tree.leaves().len(), 2);
/// assert_eq!(tree.leaf_counts()[&root], 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DivisionTree {
    graph: DiGraph<HierarchicalCell, ()>,
    roots: Vec<NodeIndex>,
}

impl DivisionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level node.
    pub fn add_root(&mut self, values: serde_json::Value) -> NodeIndex {
        self.add_root_at(values, 0)
    }

    pub(crate) fn add_root_at(&mut self, values: serde_json::Value, row_index: usize) -> NodeIndex {
        let node = self.graph.add_node(HierarchicalCell {
            values,
            row_index,
            col_index: 0,
        });
        self.roots.push(node);
        node
    }

    /// Append a child after `parent`'s existing children.
    pub fn add_child(&mut self, parent: NodeIndex, values: serde_json::Value) -> NodeIndex {
        self.add_child_at(parent, values, 0)
    }

    pub(crate) fn add_child_at(
        &mut self,
        parent: NodeIndex,
        values: serde_json::Value,
        row_index: usize,
    ) -> NodeIndex {
        let col_index = self.graph[parent].col_index + 1;
        let node = self.graph.add_node(HierarchicalCell {
            values,
            row_index,
            col_index,
        });
        self.graph.add_edge(parent, node, ());
        node
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn cell(&self, node: NodeIndex) -> &HierarchicalCell {
        &self.graph[node]
    }

    /// Children of `node` in insertion order.
    pub fn children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, child)| child).collect()
    }

    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
    }

    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_none()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of columns: the deepest node's depth plus one.
    pub fn depth(&self) -> usize {
        self.graph
            .node_weights()
            .map(|cell| cell.col_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Leaf-descendant count of every node; a leaf counts itself.
    pub fn leaf_counts(&self) -> HashMap<NodeIndex, usize> {
        let mut counts = HashMap::with_capacity(self.graph.node_count());
        for &root in &self.roots {
            let mut dfs = DfsPostOrder::new(&self.graph, root);
            while let Some(node) = dfs.next(&self.graph) {
                let below: usize = self
                    .graph
                    .neighbors_directed(node, Direction::Outgoing)
                    .map(|child| counts.get(&child).copied().unwrap_or(0))
                    .sum();
                counts.insert(node, below.max(1));
            }
        }
        counts
    }

    /// Nodes in depth-first pre-order, siblings left to right.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        order
    }

    /// Leaves in grid-row order.
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.preorder()
            .into_iter()
            .filter(|&node| self.is_leaf(node))
            .collect()
    }

    /// Root-first path ending at `node`.
    pub fn path_to(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}
