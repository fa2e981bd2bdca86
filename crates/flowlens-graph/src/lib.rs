//! Flowlens Graph - File lineage management
//!
//! This crate turns a pipeline metadata document into a graph of files
//! and answers the one question the viewer keeps asking: what surrounds
//! the selected file, and how far away is each neighbor?
//!
//! # Architecture
//!
//! The graph uses petgraph internally with additional indexes for:
//! - Id-based lookups
//! - Step-based grouping
//!
//! On top of it sit the neighborhood resolver, the view model handed to
//! the renderer, and the details presenter.
//!
//! # Example
//!
//! ```no_run
//! use flowlens_core::MetadataDocument;
//! use flowlens_graph::{LineageGraph, ViewOptions};
//!
//! let doc = MetadataDocument::from_path("metadata.json").unwrap();
//! let graph = LineageGraph::from(doc);
//!
//! let view = graph.build_view("some-file-id", &ViewOptions::new(2).excluding("raw"));
//! println!("{}", view.to_dot());
//! ```

mod builder;
mod details;
mod edge;
mod graph;
mod neighborhood;
mod view;

pub use builder::GraphBuilder;
pub use details::{details_html, NodeDetails};
pub use edge::GraphEdge;
pub use graph::{GraphStats, LineageGraph, NodeId};
pub use neighborhood::{LevelEntry, Neighborhood, TraversalDirection};
pub use view::{
    node_label, NeighborhoodView, ViewNode, ViewOptions, DEFAULT_DEPTH, SELECTED_COLOR,
};
