//! Bounded-depth neighborhood resolution.
//!
//! Walks the lineage graph depth-first from a selected file, up through
//! its inputs (ancestors) and down through its consumers (descendants),
//! recording how many hops away each file sits.
//!
//! A step name may be excluded. The exclusion is applied where the walk
//! *expands* a node, not where it *reaches* one:
//! - ancestors: a file produced by the excluded step is still reported
//!   when its consumer lists it as an input, but its own inputs are not
//!   explored.
//! - descendants: a consumer produced by the excluded step is neither
//!   reported nor explored.
//!
//! A file reached by several paths is visited once per path, in pre-order,
//! and its depth is the one from the last visit. A walk never steps onto a
//! file already on its own path, so cyclic input references terminate.

use crate::graph::{LineageGraph, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which way a walk follows the input edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalDirection {
    /// Towards the files a node was derived from.
    Ancestors,
    /// Towards the files derived from a node.
    Descendants,
}

impl std::fmt::Display for TraversalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraversalDirection::Ancestors => write!(f, "ancestors"),
            TraversalDirection::Descendants => write!(f, "descendants"),
        }
    }
}

/// A file reached by a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    /// The node's graph index.
    #[serde(skip)]
    pub node_id: NodeId,
    /// File id.
    pub id: String,
    /// Number of hops from the selected file (always >= 1).
    pub depth: usize,
}

/// Result of resolving both directions around a selected file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Neighborhood {
    /// Graph index of the selected file, if it exists.
    #[serde(skip)]
    pub selected: Option<NodeId>,
    /// Id that was asked for.
    pub selected_id: String,
    /// Ancestors in walk order.
    pub ancestors: Vec<LevelEntry>,
    /// Descendants in walk order.
    pub descendants: Vec<LevelEntry>,
    /// Maximum depth searched.
    pub max_depth: usize,
}

impl Neighborhood {
    /// True when the selected id is absent from the graph.
    pub fn is_not_found(&self) -> bool {
        self.selected.is_none()
    }

    /// Every reached node with its signed level, selected node first.
    ///
    /// Ancestors are assigned before descendants, so a node reachable in
    /// both directions (only possible through a cycle) ends up with its
    /// descendant level. The selected node always stays at level 0.
    pub fn levels(&self) -> Vec<(NodeId, i64)> {
        let Some(selected) = self.selected else {
            return Vec::new();
        };

        let mut levels = vec![(selected, 0)];
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        position.insert(selected, 0);

        let ancestors = self.ancestors.iter().map(|e| (e.node_id, -(e.depth as i64)));
        let descendants = self.descendants.iter().map(|e| (e.node_id, e.depth as i64));
        for (node, level) in ancestors.chain(descendants) {
            match position.get(&node) {
                Some(&0) => {}
                Some(&at) => levels[at].1 = level,
                None => {
                    position.insert(node, levels.len());
                    levels.push((node, level));
                }
            }
        }
        levels
    }
}

impl LineageGraph {
    /// Finds the inputs of `id` up to `max_depth` hops away.
    ///
    /// Returns nothing when `max_depth` is 0, when `id` is unknown, or when
    /// `id` itself was produced by `excluded_step`.
    pub fn find_ancestors(
        &self,
        id: &str,
        max_depth: usize,
        excluded_step: Option<&str>,
    ) -> Vec<LevelEntry> {
        match self.get_index(id) {
            Some(root) => self.walk(root, TraversalDirection::Ancestors, max_depth, excluded_step),
            None => Vec::new(),
        }
    }

    /// Finds the consumers of `id` up to `max_depth` hops away.
    ///
    /// Consumers produced by `excluded_step` are skipped along with
    /// everything only reachable through them.
    pub fn find_descendants(
        &self,
        id: &str,
        max_depth: usize,
        excluded_step: Option<&str>,
    ) -> Vec<LevelEntry> {
        match self.get_index(id) {
            Some(root) => {
                self.walk(root, TraversalDirection::Descendants, max_depth, excluded_step)
            }
            None => Vec::new(),
        }
    }

    /// Resolves ancestors and descendants of `id` in one go.
    pub fn resolve_neighborhood(
        &self,
        id: &str,
        max_depth: usize,
        excluded_step: Option<&str>,
    ) -> Neighborhood {
        let Some(root) = self.get_index(id) else {
            return Neighborhood {
                selected: None,
                selected_id: id.to_owned(),
                ancestors: Vec::new(),
                descendants: Vec::new(),
                max_depth,
            };
        };

        Neighborhood {
            selected: Some(root),
            selected_id: id.to_owned(),
            ancestors: self.walk(root, TraversalDirection::Ancestors, max_depth, excluded_step),
            descendants: self.walk(
                root,
                TraversalDirection::Descendants,
                max_depth,
                excluded_step,
            ),
            max_depth,
        }
    }

    /// Nodes one hop away from `node` that a walk may step onto.
    fn expand(
        &self,
        node: NodeId,
        direction: TraversalDirection,
        excluded_step: Option<&str>,
    ) -> Vec<NodeId> {
        match direction {
            TraversalDirection::Ancestors => match self.get(node) {
                Some(file) if !file.is_excluded_by(excluded_step) => self.inputs_of(node),
                _ => Vec::new(),
            },
            TraversalDirection::Descendants => self
                .dependents_of(node)
                .into_iter()
                .filter(|&child| {
                    self.get(child)
                        .is_some_and(|file| !file.is_excluded_by(excluded_step))
                })
                .collect(),
        }
    }

    /// Depth-first walk from `root`, pre-order, siblings in declared order.
    ///
    /// Entries come out in first-visit order; each carries the depth of its
    /// last visit.
    fn walk(
        &self,
        root: NodeId,
        direction: TraversalDirection,
        max_depth: usize,
        excluded_step: Option<&str>,
    ) -> Vec<LevelEntry> {
        enum Visit {
            Enter(NodeId, usize),
            Leave(NodeId),
        }

        if max_depth == 0 {
            return Vec::new();
        }

        // Nodes on the path from the root to the current node.
        let mut path: HashSet<NodeId> = HashSet::new();
        path.insert(root);

        let mut last_depth: HashMap<NodeId, usize> = HashMap::new();
        let mut order: Vec<NodeId> = Vec::new();

        let mut stack: Vec<Visit> = self
            .expand(root, direction, excluded_step)
            .into_iter()
            .rev()
            .map(|n| Visit::Enter(n, 1))
            .collect();

        while let Some(visit) = stack.pop() {
            let (node, depth) = match visit {
                Visit::Leave(node) => {
                    path.remove(&node);
                    continue;
                }
                Visit::Enter(node, depth) => (node, depth),
            };

            if path.contains(&node) {
                continue;
            }
            if last_depth.insert(node, depth).is_none() {
                order.push(node);
            }

            if depth < max_depth {
                path.insert(node);
                stack.push(Visit::Leave(node));
                for next in self.expand(node, direction, excluded_step).into_iter().rev() {
                    stack.push(Visit::Enter(next, depth + 1));
                }
            }
        }

        order
            .into_iter()
            .filter_map(|node| {
                Some(LevelEntry {
                    node_id: node,
                    id: self.get(node)?.uuid.clone(),
                    depth: last_depth[&node],
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlens_core::{FileNode, MetadataDocument, Step};

    fn file(id: &str, step: &str, inputs: &[&str]) -> FileNode {
        FileNode::new(id, format!("{id}.csv"))
            .with_step(Step::new(format!("data/{step}")).named(step))
            .with_inputs(inputs.iter().copied())
    }

    fn graph(files: Vec<FileNode>) -> LineageGraph {
        LineageGraph::from(MetadataDocument::new(files))
    }

    fn ids(entries: &[LevelEntry]) -> Vec<(&str, usize)> {
        entries.iter().map(|e| (e.id.as_str(), e.depth)).collect()
    }

    #[test]
    fn test_zero_depth_is_empty() {
        let g = graph(vec![file("a", "s1", &[]), file("b", "s2", &["a"])]);
        assert!(g.find_ancestors("b", 0, None).is_empty());
        assert!(g.find_descendants("a", 0, None).is_empty());
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let g = graph(vec![file("a", "s1", &[])]);
        let n = g.resolve_neighborhood("ghost", 3, None);
        assert!(n.is_not_found());
        assert!(n.levels().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        // a -> b -> c -> d
        let g = graph(vec![
            file("a", "s1", &[]),
            file("b", "s2", &["a"]),
            file("c", "s3", &["b"]),
            file("d", "s4", &["c"]),
        ]);

        assert_eq!(ids(&g.find_ancestors("c", 1, None)), vec![("b", 1)]);
        assert_eq!(ids(&g.find_ancestors("c", 5, None)), vec![("b", 1), ("a", 2)]);
        assert_eq!(ids(&g.find_descendants("a", 2, None)), vec![("b", 1), ("c", 2)]);
    }

    #[test]
    fn test_dfs_order_follows_declared_inputs() {
        //  x   y
        //  |   |
        //  p   q
        //   \ /
        //    t
        let g = graph(vec![
            file("x", "raw", &[]),
            file("y", "raw", &[]),
            file("p", "mid", &["x"]),
            file("q", "mid", &["y"]),
            file("t", "out", &["q", "p"]),
        ]);

        assert_eq!(
            ids(&g.find_ancestors("t", 2, None)),
            vec![("q", 1), ("y", 2), ("p", 1), ("x", 2)]
        );
    }

    #[test]
    fn test_diamond_takes_depth_of_last_path() {
        // d <- [a, b], b <- a: a is visited at 1, then again at 2 through b.
        let g = graph(vec![
            file("a", "s1", &[]),
            file("b", "s2", &["a"]),
            file("d", "s3", &["a", "b"]),
        ]);
        assert_eq!(ids(&g.find_ancestors("d", 2, None)), vec![("a", 2), ("b", 1)]);

        // Same diamond with the inputs declared the other way round.
        let g = graph(vec![
            file("a", "s1", &[]),
            file("b", "s2", &["a"]),
            file("d", "s3", &["b", "a"]),
        ]);
        assert_eq!(ids(&g.find_ancestors("d", 3, None)), vec![("b", 1), ("a", 1)]);
    }

    #[test]
    fn test_diamond_level_in_view() {
        let g = graph(vec![
            file("a", "s1", &[]),
            file("b", "s2", &["a"]),
            file("d", "s3", &["a", "b"]),
        ]);

        let view = g.build_view("d", &crate::ViewOptions::new(2));
        assert_eq!(view.level_of("a"), Some(-2));
        assert_eq!(view.level_of("b"), Some(-1));

        // Descendant side: d is visited at 2 through b, then at 1 directly.
        let view = g.build_view("a", &crate::ViewOptions::new(2));
        assert_eq!(view.level_of("b"), Some(1));
        assert_eq!(view.level_of("d"), Some(1));
    }

    #[test]
    fn test_every_path_is_walked() {
        // root <- [long, m], long <- m, m <- top. m is first reached at
        // depth 2 with no budget left; the direct edge reaches it again at
        // depth 1 and goes on to top.
        let g = graph(vec![
            file("top", "s", &[]),
            file("m", "s", &["top"]),
            file("long", "s", &["m"]),
            file("root", "s", &["long", "m"]),
        ]);

        let ancestors = g.find_ancestors("root", 2, None);
        assert_eq!(ids(&ancestors), vec![("long", 1), ("m", 1), ("top", 2)]);
    }

    #[test]
    fn test_excluded_ancestor_is_reported_but_not_expanded() {
        // a -> b -> c, b produced by "skip"
        let g = graph(vec![
            file("a", "raw", &[]),
            file("b", "skip", &["a"]),
            file("c", "out", &["b"]),
        ]);

        assert_eq!(ids(&g.find_ancestors("c", 5, Some("skip"))), vec![("b", 1)]);
    }

    #[test]
    fn test_excluded_root_has_no_ancestors() {
        let g = graph(vec![file("a", "raw", &[]), file("b", "skip", &["a"])]);
        assert!(g.find_ancestors("b", 5, Some("skip")).is_empty());
        // The descendant walk checks consumers, never the root.
        assert_eq!(ids(&g.find_descendants("a", 5, Some("raw"))), vec![("b", 1)]);
        assert!(g.find_descendants("a", 5, Some("skip")).is_empty());
    }

    #[test]
    fn test_excluded_descendant_stops_walk() {
        // a -> b -> c, b produced by "skip"
        let g = graph(vec![
            file("a", "raw", &[]),
            file("b", "skip", &["a"]),
            file("c", "out", &["b"]),
        ]);

        assert!(g.find_descendants("a", 5, Some("skip")).is_empty());
    }

    #[test]
    fn test_cycle_no_infinite_loop() {
        // a -> b -> c -> a
        let g = graph(vec![
            file("a", "s", &["c"]),
            file("b", "s", &["a"]),
            file("c", "s", &["b"]),
        ]);

        let n = g.resolve_neighborhood("a", 50, None);
        assert_eq!(ids(&n.ancestors), vec![("c", 1), ("b", 2)]);
        assert_eq!(ids(&n.descendants), vec![("b", 1), ("c", 2)]);

        // b and c sit on both sides; the descendant level wins and a
        // stays the selected node.
        let levels: Vec<(&str, i64)> = n
            .levels()
            .into_iter()
            .map(|(idx, level)| (g.get(idx).unwrap().uuid.as_str(), level))
            .collect();
        assert_eq!(levels, vec![("a", 0), ("c", 2), ("b", 1)]);
    }

    #[test]
    fn test_self_reference_terminates() {
        let g = graph(vec![file("a", "s", &["a"])]);
        assert!(g.find_ancestors("a", 10, None).is_empty());
        assert!(g.find_descendants("a", 10, None).is_empty());
    }

    #[test]
    fn test_levels_are_signed() {
        let g = graph(vec![
            file("a", "s1", &[]),
            file("b", "s2", &["a"]),
            file("c", "s3", &["b"]),
        ]);

        let n = g.resolve_neighborhood("b", 1, None);
        let levels: Vec<(&str, i64)> = n
            .levels()
            .into_iter()
            .map(|(idx, level)| (g.get(idx).unwrap().uuid.as_str(), level))
            .collect();
        assert_eq!(levels, vec![("b", 0), ("a", -1), ("c", 1)]);
    }
}
