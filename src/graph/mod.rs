//! Operation dependency graph.
//!
//! Nodes are stored in trace order. `depends_on` holds indices of earlier
//! nodes that must complete before this one starts; an index is always
//! smaller than the index of the node that lists it, so the graph is acyclic
//! and index order is already a valid execution order.

pub mod operation;

pub use operation::{Operation, OperationType, OperationTypes};

use crate::{GraphError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNode {
    /// Position among "hit" events in the recorded trace; 0 means unset.
    pub hit_index: u32,
    pub operation: Operation,
    depends_on: Vec<usize>,
}

impl OperationNode {
    pub fn depends_on(&self) -> &[usize] {
        &self.depends_on
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationGraph {
    nodes: Vec<OperationNode>,
}

impl OperationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its index.
    ///
    /// Every entry of `depends_on` must refer to an already appended node.
    /// On failure the graph is left untouched.
    pub fn append(
        &mut self,
        operation: Operation,
        hit_index: u32,
        depends_on: Vec<usize>,
    ) -> Result<usize> {
        let count = self.nodes.len();
        if let Some(&index) = depends_on.iter().find(|&&d| d >= count) {
            return Err(GraphError::InvalidReference { index, count });
        }

        self.nodes.push(OperationNode {
            hit_index,
            operation,
            depends_on,
        });
        Ok(count)
    }

    pub fn nodes(&self) -> &[OperationNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&OperationNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.depends_on.len()).sum()
    }

    /// Nodes without dependencies, in index order.
    pub fn roots(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.depends_on.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Reverse adjacency: for each node, the nodes that depend on it (ascending).
    pub fn dependents(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for &d in &node.depends_on {
                // Duplicate edges collapse to one dependent entry.
                if out[d].last() != Some(&i) {
                    out[d].push(i);
                }
            }
        }
        out
    }

    /// Group nodes into levels; every dependency of a node sits in an earlier
    /// level, so nodes within one level can run concurrently.
    pub fn execution_levels(&self) -> Vec<Vec<usize>> {
        let mut level_of: Vec<usize> = Vec::with_capacity(self.nodes.len());
        let mut levels: Vec<Vec<usize>> = Vec::new();

        for (i, node) in self.nodes.iter().enumerate() {
            let level = node
                .depends_on
                .iter()
                .map(|&d| level_of[d] + 1)
                .max()
                .unwrap_or(0);
            level_of.push(level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(i);
        }

        levels
    }
}
