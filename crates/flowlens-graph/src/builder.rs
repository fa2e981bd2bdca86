//! Graph builder for constructing the lineage graph from a document.
//!
//! The builder takes FileNodes and resolves their input references into
//! actual graph edges.

use crate::graph::{LineageGraph, NodeId};
use flowlens_core::{FileNode, MetadataDocument};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Builds a LineageGraph from file records.
///
/// The builder handles the two-pass process:
/// 1. Add all nodes to the graph
/// 2. Resolve input references into edges
#[derive(Default)]
pub struct GraphBuilder {
    graph: LineageGraph,
    seen: HashSet<String>,
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds file records to the graph.
    ///
    /// Records whose id was already added are dropped; lookups by id
    /// always return the first record.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = FileNode>) {
        for node in nodes {
            if !self.seen.insert(node.uuid.clone()) {
                warn!("Duplicate file id {}, keeping the first record", node.uuid);
                continue;
            }
            self.graph.add_node(node);
        }
    }

    /// Resolves input references into edges.
    ///
    /// References to ids missing from the document are recorded and
    /// otherwise ignored.
    pub fn resolve_edges(&mut self) {
        let mut edges_to_add = Vec::new();
        let mut dangling = Vec::new();

        let node_indices: Vec<NodeId> = self.graph.node_indexes().collect();

        for consumer in node_indices {
            let Some(node) = self.graph.get(consumer) else {
                continue;
            };

            for input in node.input_ids() {
                match self.graph.get_index(input) {
                    Some(input_idx) => edges_to_add.push((input_idx, consumer)),
                    None => {
                        debug!("Dangling input {} on file {}", input, node.uuid);
                        dangling.push((node.uuid.clone(), input.to_owned()));
                    }
                }
            }
        }

        for (input, consumer) in edges_to_add {
            self.graph.add_edge(input, consumer);
        }
        for (consumer, missing) in dangling {
            self.graph.record_dangling(&consumer, &missing);
        }
    }

    /// Finishes building and returns the graph.
    pub fn build(mut self) -> LineageGraph {
        self.resolve_edges();
        self.graph
    }
}

impl LineageGraph {
    /// Builds a graph from a whole metadata document.
    pub fn from_document(document: &MetadataDocument) -> Self {
        let mut builder = GraphBuilder::new();
        builder.add_nodes(document.files.iter().cloned());
        builder.build()
    }
}

impl From<MetadataDocument> for LineageGraph {
    fn from(document: MetadataDocument) -> Self {
        let mut builder = GraphBuilder::new();
        builder.add_nodes(document.files);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_adds_nodes() {
        let mut builder = GraphBuilder::new();
        builder.add_nodes(vec![FileNode::new("a", "a.csv"), FileNode::new("b", "b.csv")]);
        let graph = builder.build();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_builder_resolves_edges() {
        let doc = MetadataDocument::new(vec![
            FileNode::new("b", "b.csv").with_inputs(["a"]),
            FileNode::new("a", "a.csv"),
        ]);
        let graph = LineageGraph::from_document(&doc);

        assert_eq!(graph.edge_count(), 1);
        let a = graph.get_index("a").unwrap();
        let b = graph.get_index("b").unwrap();
        assert_eq!(graph.inputs_of(b), vec![a]);
        assert_eq!(graph.dependents_of(a), vec![b]);
    }

    #[test]
    fn test_dangling_references_are_tolerated() {
        let doc = MetadataDocument::new(vec![
            FileNode::new("a", "a.csv").with_inputs(["ghost", "b"]),
            FileNode::new("b", "b.csv"),
        ]);
        let graph = LineageGraph::from(doc);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.dangling_references(),
            &[("a".to_string(), "ghost".to_string())]
        );
        assert_eq!(graph.stats().dangling_references, 1);
    }

    #[test]
    fn test_duplicate_records_dropped() {
        let doc = MetadataDocument::new(vec![
            FileNode::new("a", "first.csv"),
            FileNode::new("a", "second.csv"),
        ]);
        let graph = LineageGraph::from(doc);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.get_by_id("a").unwrap().name, "first.csv");
    }
}
