//! Core graph data structure.
//!
//! The LineageGraph wraps petgraph and adds indexes for fast lookups.
//! Node indexes follow document order because nodes are only ever
//! appended, never removed; a re-fetched document builds a new graph.

use flowlens_core::FileNode;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// The file lineage graph.
///
/// Stores every file of a metadata document as a node and every
/// resolvable input reference as an edge from input to consumer. Edges
/// carry no weight; declared input order is read from the consumer.
#[derive(Debug, Default)]
pub struct LineageGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: DiGraph<FileNode, ()>,

    /// Maps file ids to graph node indexes.
    id_index: HashMap<String, NodeId>,

    /// Maps step names to the files they produced.
    step_index: HashMap<String, Vec<NodeId>>,

    /// Input references that did not resolve, as (consumer, missing input).
    dangling: Vec<(String, String)>,
}

impl LineageGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file node to the graph.
    ///
    /// If the id is already known, the index keeps pointing at the first
    /// node with that id.
    pub fn add_node(&mut self, node: FileNode) -> NodeId {
        let id = node.uuid.clone();
        let step = node.step_name().map(str::to_owned);

        let index = self.graph.add_node(node);

        self.id_index.entry(id).or_insert(index);
        if let Some(step) = step {
            self.step_index.entry(step).or_default().push(index);
        }

        index
    }

    /// Adds an input edge from `input` to `consumer`.
    pub fn add_edge(&mut self, input: NodeId, consumer: NodeId) {
        self.graph.add_edge(input, consumer, ());
    }

    pub(crate) fn record_dangling(&mut self, consumer: &str, missing: &str) {
        self.dangling.push((consumer.to_owned(), missing.to_owned()));
    }

    /// Gets a node by its file id.
    pub fn get_by_id(&self, id: &str) -> Option<&FileNode> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Gets a node by its graph index.
    pub fn get(&self, index: NodeId) -> Option<&FileNode> {
        self.graph.node_weight(index)
    }

    /// Gets the node index for a file id.
    pub fn get_index(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// The first file of the document, if any.
    pub fn first(&self) -> Option<&FileNode> {
        self.graph.node_weights().next()
    }

    /// Finds all files produced by a step.
    pub fn find_by_step(&self, step_name: &str) -> Vec<&FileNode> {
        self.step_index
            .get(step_name)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|idx| self.graph.node_weight(*idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct inputs of a node, in the order the file declares them.
    ///
    /// References to unknown ids are skipped.
    pub fn inputs_of(&self, index: NodeId) -> Vec<NodeId> {
        self.get(index)
            .map(|node| {
                node.input_ids()
                    .filter_map(|id| self.get_index(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Files that directly consume a node, in document order.
    pub fn dependents_of(&self, index: NodeId) -> Vec<NodeId> {
        let mut dependents: Vec<NodeId> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all node indexes in document order.
    pub fn node_indexes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Input references that did not resolve while building.
    pub fn dangling_references(&self) -> &[(String, String)] {
        &self.dangling
    }
}

/// Graph statistics for the info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub steps: usize,
    pub dangling_references: usize,
}

impl LineageGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            steps: self.step_index.len(),
            dangling_references: self.dangling.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlens_core::Step;

    #[test]
    fn test_indexes() {
        let mut graph = LineageGraph::new();
        let a = graph.add_node(
            FileNode::new("a", "Sales.csv").with_step(Step::new("data/raw").named("raw")),
        );
        graph.add_node(FileNode::new("b", "costs.csv").with_step(Step::new("data/raw").named("raw")));

        assert_eq!(graph.get_index("a"), Some(a));
        assert_eq!(graph.get_by_id("b").unwrap().name, "costs.csv");
        assert_eq!(graph.find_by_step("raw").len(), 2);
        assert!(graph.find_by_step("clean").is_empty());
        assert_eq!(graph.first().unwrap().uuid, "a");
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let mut graph = LineageGraph::new();
        let first = graph.add_node(FileNode::new("dup", "first.csv"));
        graph.add_node(FileNode::new("dup", "second.csv"));

        assert_eq!(graph.get_index("dup"), Some(first));
        assert_eq!(graph.get_by_id("dup").unwrap().name, "first.csv");
    }

    #[test]
    fn test_dependents_in_document_order() {
        let mut graph = LineageGraph::new();
        let src = graph.add_node(FileNode::new("src", "src"));
        let x = graph.add_node(FileNode::new("x", "x"));
        let y = graph.add_node(FileNode::new("y", "y"));

        graph.add_edge(src, y);
        graph.add_edge(src, x);
        graph.add_edge(src, x);

        assert_eq!(graph.dependents_of(src), vec![x, y]);
        assert_eq!(graph.edge_count(), 3);
    }
}
