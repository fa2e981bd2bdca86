//! View model handed to the external graph renderer.
//!
//! A view is the induced subgraph around the selected file: the files the
//! neighborhood walk reached, minus any produced by the excluded step, and
//! the input edges between the files that remain.

use crate::edge::GraphEdge;
use crate::graph::{LineageGraph, NodeId};
use flowlens_core::{FileNode, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// Highlight color of the selected node.
pub const SELECTED_COLOR: &str = "#ffb347";

/// Default number of hops shown in each direction.
pub const DEFAULT_DEPTH: usize = 2;

/// User-controlled inputs of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Maximum hops in each direction.
    pub depth: usize,
    /// Step whose files are hidden.
    pub exclude_step: Option<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            exclude_step: None,
        }
    }
}

impl ViewOptions {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            exclude_step: None,
        }
    }

    /// Hides files produced by `step`. An empty name clears the exclusion.
    pub fn excluding(mut self, step: impl Into<String>) -> Self {
        self.exclude_step = Some(step.into()).filter(|s| !s.is_empty());
        self
    }

    /// The excluded step, if one is set.
    pub fn excluded_step(&self) -> Option<&str> {
        self.exclude_step.as_deref().filter(|s| !s.is_empty())
    }
}

/// A node as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNode {
    pub id: String,
    /// Signed hop distance from the selected file; a layout hint.
    pub level: i64,
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub step_name: Option<String>,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ViewNode {
    fn from_file(file: &FileNode, level: i64, selected: bool) -> Self {
        Self {
            id: file.uuid.clone(),
            level,
            label: node_label(file),
            name: file.name.clone(),
            file_type: file.file_type.clone(),
            step_name: file.step_name().map(str::to_owned),
            selected,
            color: selected.then(|| SELECTED_COLOR.to_owned()),
        }
    }
}

/// Label text: `name.type`, then the step path and step name.
///
/// Pipelines record names without an extension; a name that already ends
/// in its type is kept as is.
pub fn node_label(file: &FileNode) -> String {
    let name = or_na(&file.name);
    let file_name = if file.file_type.is_empty()
        || name.ends_with(&format!(".{}", file.file_type))
    {
        name.to_owned()
    } else {
        format!("{}.{}", name, file.file_type)
    };

    format!(
        "{}\nPath: {}\nStep: {}",
        file_name,
        file.step_path().unwrap_or(NOT_AVAILABLE),
        file.step_name().unwrap_or(NOT_AVAILABLE)
    )
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

/// Nodes and edges of the neighborhood around one selected file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodView {
    /// Id that was selected.
    pub selected: String,
    /// Whether the selected id exists in the document.
    pub found: bool,
    pub depth: usize,
    pub exclude_step: Option<String>,
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<GraphEdge>,
}

impl NeighborhoodView {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn level_of(&self, id: &str) -> Option<i64> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.level)
    }

    /// Nodes grouped by level, lowest (farthest ancestor) first.
    pub fn by_level(&self) -> BTreeMap<i64, Vec<&ViewNode>> {
        let mut levels: BTreeMap<i64, Vec<&ViewNode>> = BTreeMap::new();
        for node in &self.nodes {
            levels.entry(node.level).or_default().push(node);
        }
        levels
    }

    /// Renders the view as a Graphviz digraph with one rank per level.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph lineage {\n");
        out.push_str("  rankdir=TB;\n");
        out.push_str("  node [shape=box, style=\"rounded,filled\", fillcolor=\"#ffffff\"];\n");

        for (level, nodes) in self.by_level() {
            let _ = write!(out, "  {{ rank=same; /* level {} */", level);
            for node in &nodes {
                let _ = write!(out, " \"{}\";", dot_escape(&node.id));
            }
            out.push_str(" }\n");
        }

        for node in &self.nodes {
            let _ = write!(
                out,
                "  \"{}\" [label=\"{}\"",
                dot_escape(&node.id),
                dot_escape(&node.label)
            );
            if let Some(color) = &node.color {
                let _ = write!(out, ", fillcolor=\"{}\"", color);
            }
            out.push_str("];\n");
        }

        for edge in &self.edges {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\";",
                dot_escape(&edge.from),
                dot_escape(&edge.to)
            );
        }

        out.push_str("}\n");
        out
    }
}

fn dot_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

impl LineageGraph {
    /// Builds the view around `selected`.
    ///
    /// Files produced by the excluded step are dropped from the view even
    /// when the walk passed through them. Edges run from input to consumer
    /// and only connect files that made it into the view.
    pub fn build_view(&self, selected: &str, options: &ViewOptions) -> NeighborhoodView {
        let excluded = options.excluded_step();
        let neighborhood = self.resolve_neighborhood(selected, options.depth, excluded);

        let mut included: Vec<NodeId> = Vec::new();
        let mut nodes = Vec::new();
        for (index, level) in neighborhood.levels() {
            let Some(file) = self.get(index) else {
                continue;
            };
            if file.is_excluded_by(excluded) {
                continue;
            }
            included.push(index);
            nodes.push(ViewNode::from_file(file, level, level == 0));
        }

        let members: HashSet<NodeId> = included.iter().copied().collect();
        let mut seen_edges = HashSet::new();
        let mut edges = Vec::new();
        for &consumer in &included {
            for input in self.inputs_of(consumer) {
                if members.contains(&input) && seen_edges.insert((input, consumer)) {
                    if let (Some(from), Some(to)) = (self.get(input), self.get(consumer)) {
                        edges.push(GraphEdge::new(from.uuid.as_str(), to.uuid.as_str()));
                    }
                }
            }
        }

        NeighborhoodView {
            selected: selected.to_owned(),
            found: !neighborhood.is_not_found(),
            depth: options.depth,
            exclude_step: excluded.map(str::to_owned),
            nodes,
            edges,
        }
    }
}
