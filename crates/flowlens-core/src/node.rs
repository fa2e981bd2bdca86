//! File records as they appear in a pipeline metadata document.
//!
//! Every field except the id is optional on the wire. Missing or null
//! values fall back to defaults so a half-written record still loads;
//! the presentation layer renders those defaults as `N/A`.

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder shown for values a record does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Treats an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The pipeline step that produced a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Directory of the step output, relative to the data root.
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,

    /// Step name, e.g. `raw` or `clean`.
    #[serde(default)]
    pub step_name: Option<String>,

    /// Version label of the step output.
    #[serde(default)]
    pub version: Option<String>,
}

/// A column descriptor. Display-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub column_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Back-reference to a file consumed while producing another file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputRef {
    #[serde(alias = "id")]
    pub uuid: String,
}

impl InputRef {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

/// A single file in the pipeline.
///
/// Loaded verbatim from the document and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Unique identifier of the file.
    #[serde(alias = "id")]
    pub uuid: String,

    /// File name, e.g. `sales.csv`.
    #[serde(default, alias = "file_name", deserialize_with = "nullable")]
    pub name: String,

    /// File type or extension, e.g. `csv`.
    #[serde(
        rename = "type",
        default,
        alias = "file_type",
        alias = "extension",
        deserialize_with = "nullable"
    )]
    pub file_type: String,

    /// Producing step. Absent for files that predate the pipeline.
    #[serde(default)]
    pub step: Option<Step>,

    #[serde(default, deserialize_with = "nullable")]
    pub columns: Vec<Column>,

    /// Label of the function used to write the file, e.g. `to_csv`.
    #[serde(default, deserialize_with = "nullable")]
    pub export_method_used: String,

    /// Files consumed to produce this one, in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub input_files: Vec<InputRef>,
}

impl FileNode {
    /// Creates a bare file record with the given id and name.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the file type.
    pub fn with_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    /// Sets the producing step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the input references.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_files = inputs.into_iter().map(InputRef::new).collect();
        self
    }

    /// Sets the column list.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Name of the producing step, if the record carries one.
    pub fn step_name(&self) -> Option<&str> {
        self.step.as_ref()?.step_name.as_deref()
    }

    /// Path of the producing step, if non-empty.
    pub fn step_path(&self) -> Option<&str> {
        self.step
            .as_ref()
            .map(|s| s.path.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Version of the producing step, if the record carries one.
    pub fn step_version(&self) -> Option<&str> {
        self.step.as_ref()?.version.as_deref()
    }

    /// Whether this file was produced by the given excluded step.
    ///
    /// A file without a step name is never excluded.
    pub fn is_excluded_by(&self, excluded_step: Option<&str>) -> bool {
        match (self.step_name(), excluded_step) {
            (Some(name), Some(excluded)) => name == excluded,
            _ => false,
        }
    }

    /// Whether this file lists `uuid` among its inputs.
    pub fn consumes(&self, uuid: &str) -> bool {
        self.input_files.iter().any(|input| input.uuid == uuid)
    }

    /// Ids of the declared inputs, in declaration order.
    pub fn input_ids(&self) -> impl Iterator<Item = &str> {
        self.input_files.iter().map(|input| input.uuid.as_str())
    }
}

impl Step {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, step_name: impl Into<String>) -> Self {
        self.step_name = Some(step_name.into());
        self
    }

    pub fn versioned(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_record_parses() {
        let json = r#"{
            "uuid": "f1",
            "name": "sales.csv",
            "type": "csv",
            "step": {"path": "data/clean", "step_name": "clean", "version": "v2"},
            "columns": [{"name": "amount", "type": "float64"}],
            "export_method_used": "to_csv",
            "input_files": [{"uuid": "f0"}]
        }"#;

        let node: FileNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.uuid, "f1");
        assert_eq!(node.file_type, "csv");
        assert_eq!(node.step_name(), Some("clean"));
        assert_eq!(node.step_version(), Some("v2"));
        assert_eq!(node.columns[0], Column::new("amount", "float64"));
        assert!(node.consumes("f0"));
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let json = r#"{"uuid": "f1", "name": null, "columns": null, "step": null}"#;

        let node: FileNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.name, "");
        assert!(node.columns.is_empty());
        assert!(node.step.is_none());
        assert!(node.input_files.is_empty());
        assert_eq!(node.step_name(), None);
        assert_eq!(node.step_path(), None);
    }

    #[test]
    fn test_aliases() {
        let json = r#"{"id": "f1", "file_name": "a.parquet", "extension": "parquet",
                       "input_files": [{"id": "f0"}]}"#;

        let node: FileNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.uuid, "f1");
        assert_eq!(node.name, "a.parquet");
        assert_eq!(node.file_type, "parquet");
        assert_eq!(node.input_ids().collect::<Vec<_>>(), vec!["f0"]);
    }

    #[test]
    fn test_exclusion_match() {
        let node = FileNode::new("f1", "a.csv").with_step(Step::new("data/raw").named("raw"));
        let bare = FileNode::new("f2", "b.csv");

        assert!(node.is_excluded_by(Some("raw")));
        assert!(!node.is_excluded_by(Some("clean")));
        assert!(!node.is_excluded_by(None));
        assert!(!bare.is_excluded_by(Some("raw")));
    }
}
