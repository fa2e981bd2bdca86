//! The metadata document and document-level lineage queries.

use crate::error::{DocumentError, Result};
use crate::node::FileNode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Default file name of a metadata document inside a step directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// A pipeline metadata document.
///
/// Holds every known file in the order the document lists them. The
/// document is replaced wholesale on re-fetch, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub files: Vec<FileNode>,
}

impl MetadataDocument {
    pub fn new(files: Vec<FileNode>) -> Self {
        Self { files }
    }

    /// Parses a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a document from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads and parses a document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| DocumentError::io(path, e))?;
        let document = Self::from_slice(&bytes)?;
        debug!(
            "Loaded {} files from {}",
            document.files.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the first file with the given id.
    pub fn get(&self, uuid: &str) -> Option<&FileNode> {
        self.files.iter().find(|f| f.uuid == uuid)
    }

    /// The file a fresh session selects.
    pub fn first(&self) -> Option<&FileNode> {
        self.files.first()
    }

    /// Distinct step names, sorted.
    pub fn step_names(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter_map(FileNode::step_name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Files that no other file in the document consumes.
    ///
    /// These are the outputs of the last step that wrote the document.
    pub fn terminal_outputs(&self) -> Vec<&FileNode> {
        let consumed: HashSet<&str> = self.files.iter().flat_map(FileNode::input_ids).collect();
        self.files
            .iter()
            .filter(|f| !consumed.contains(f.uuid.as_str()))
            .collect()
    }

    /// Files directly consumed by the terminal outputs.
    pub fn direct_inputs(&self) -> Vec<&FileNode> {
        let wanted: HashSet<&str> = self
            .terminal_outputs()
            .into_iter()
            .flat_map(FileNode::input_ids)
            .collect();
        self.files
            .iter()
            .filter(|f| wanted.contains(f.uuid.as_str()))
            .collect()
    }

    /// Every file transitively needed to produce `uuid`, in document order.
    ///
    /// The file itself is not part of the result, unless it sits on a cycle.
    pub fn files_needed_to_generate(&self, uuid: &str) -> Vec<&FileNode> {
        let by_id: HashMap<&str, &FileNode> = self
            .files
            .iter()
            .rev()
            .map(|f| (f.uuid.as_str(), f))
            .collect();

        let mut needed: HashSet<&str> = HashSet::new();
        let mut frontier: Vec<&str> = match by_id.get(uuid) {
            Some(file) => file.input_ids().collect(),
            None => return Vec::new(),
        };

        while let Some(current) = frontier.pop() {
            if !needed.insert(current) {
                continue;
            }
            if let Some(file) = by_id.get(current) {
                frontier.extend(file.input_ids().filter(|id| !needed.contains(id)));
            }
        }

        self.files
            .iter()
            .filter(|f| needed.contains(f.uuid.as_str()))
            .collect()
    }

    /// Input references that point at ids missing from the document.
    ///
    /// Returned as `(consumer id, missing input id)` pairs.
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        let known: HashSet<&str> = self.files.iter().map(|f| f.uuid.as_str()).collect();
        self.files
            .iter()
            .flat_map(|f| {
                f.input_ids()
                    .filter(|id| !known.contains(id))
                    .map(move |id| (f.uuid.as_str(), id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Step;
    use std::io::Write;

    fn pipeline() -> MetadataDocument {
        // raw_a, raw_b -> merged -> report
        MetadataDocument::new(vec![
            FileNode::new("raw_a", "a.csv").with_step(Step::new("data/raw").named("raw")),
            FileNode::new("raw_b", "b.csv").with_step(Step::new("data/raw").named("raw")),
            FileNode::new("merged", "merged.csv")
                .with_step(Step::new("data/merge").named("merge"))
                .with_inputs(["raw_a", "raw_b"]),
            FileNode::new("report", "report.xlsx")
                .with_step(Step::new("data/report").named("report"))
                .with_inputs(["merged"]),
        ])
    }

    fn ids(files: Vec<&FileNode>) -> Vec<&str> {
        files.into_iter().map(|f| f.uuid.as_str()).collect()
    }

    #[test]
    fn test_parse_document() {
        let json = r#"{"files": [{"uuid": "x", "name": "x.csv", "input_files": []}], "extra": 1}"#;
        let doc = MetadataDocument::from_json(json).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.first().unwrap().uuid, "x");
    }

    #[test]
    fn test_missing_files_key_is_empty() {
        let doc = MetadataDocument::from_json("{}").unwrap();
        assert!(doc.is_empty());
        assert!(doc.first().is_none());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = MetadataDocument::from_json("{not json").unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"files": [{{"uuid": "a"}}, {{"uuid": "b"}}]}}"#).unwrap();

        let doc = MetadataDocument::from_path(file.path()).unwrap();
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_from_missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MetadataDocument::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[test]
    fn test_terminal_outputs_and_direct_inputs() {
        let doc = pipeline();
        assert_eq!(ids(doc.terminal_outputs()), vec!["report"]);
        assert_eq!(ids(doc.direct_inputs()), vec!["merged"]);
    }

    #[test]
    fn test_files_needed_to_generate() {
        let doc = pipeline();
        assert_eq!(
            ids(doc.files_needed_to_generate("report")),
            vec!["raw_a", "raw_b", "merged"]
        );
        assert!(doc.files_needed_to_generate("raw_a").is_empty());
        assert!(doc.files_needed_to_generate("ghost").is_empty());
    }

    #[test]
    fn test_files_needed_survives_cycle() {
        let doc = MetadataDocument::new(vec![
            FileNode::new("a", "a").with_inputs(["b"]),
            FileNode::new("b", "b").with_inputs(["a"]),
        ]);
        assert_eq!(ids(doc.files_needed_to_generate("a")), vec!["a", "b"]);
    }

    #[test]
    fn test_dangling_references() {
        let doc = MetadataDocument::new(vec![
            FileNode::new("a", "a").with_inputs(["ghost", "b"]),
            FileNode::new("b", "b"),
        ]);
        assert_eq!(doc.dangling_references(), vec![("a", "ghost")]);
    }

    #[test]
    fn test_step_names() {
        assert_eq!(pipeline().step_names(), vec!["merge", "raw", "report"]);
    }
}
