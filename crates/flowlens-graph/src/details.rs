//! Details panel for the selected file.

use crate::graph::LineageGraph;
use flowlens_core::{Column, FileNode, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable record of one file.
///
/// Every value is display-ready: anything the record lacks reads `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub step_path: String,
    pub step_name: String,
    pub step_version: String,
    pub columns: Vec<Column>,
    pub export_method: String,
    /// Ids of the declared inputs, dangling ones included.
    pub inputs: Vec<String>,
}

fn display(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_owned()
}

impl From<&FileNode> for NodeDetails {
    fn from(file: &FileNode) -> Self {
        Self {
            id: file.uuid.clone(),
            name: display(Some(file.name.as_str())),
            file_type: display(Some(file.file_type.as_str())),
            step_path: display(file.step_path()),
            step_name: display(file.step_name()),
            step_version: display(file.step_version()),
            columns: file.columns.clone(),
            export_method: display(Some(file.export_method_used.as_str())),
            inputs: file.input_ids().map(str::to_owned).collect(),
        }
    }
}

impl LineageGraph {
    /// Projects the details of `id`, or `None` when the id is unknown.
    pub fn details(&self, id: &str) -> Option<NodeDetails> {
        self.get_by_id(id).map(NodeDetails::from)
    }
}

impl NodeDetails {
    /// Renders the record as an HTML fragment for the details panel.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"node-details\">\n");
        html.push_str(&format!("  <h3>{}</h3>\n", escape_html(&self.name)));
        html.push_str("  <dl>\n");
        for (label, value) in [
            ("Id", &self.id),
            ("Type", &self.file_type),
            ("Step path", &self.step_path),
            ("Step name", &self.step_name),
            ("Step version", &self.step_version),
            ("Export method", &self.export_method),
        ] {
            html.push_str(&format!(
                "    <dt>{}</dt><dd>{}</dd>\n",
                label,
                escape_html(value)
            ));
        }
        html.push_str("  </dl>\n");

        html.push_str("  <h4>Columns</h4>\n");
        if self.columns.is_empty() {
            html.push_str(&format!("  <p>{}</p>\n", NOT_AVAILABLE));
        } else {
            html.push_str("  <ul>\n");
            for column in &self.columns {
                html.push_str(&format!(
                    "    <li>{}: {}</li>\n",
                    escape_html(&column.name),
                    escape_html(&column.column_type)
                ));
            }
            html.push_str("  </ul>\n");
        }

        html.push_str("</div>\n");
        html
    }
}

/// HTML for the details panel, including the "no match" case.
pub fn details_html(details: Option<&NodeDetails>, requested_id: &str) -> String {
    match details {
        Some(details) => details.to_html(),
        None => format!(
            "<div class=\"node-details\">\n  <p>No file found with id {}</p>\n</div>\n",
            escape_html(requested_id)
        ),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  id:            {}", self.id)?;
        writeln!(f, "  type:          {}", self.file_type)?;
        writeln!(f, "  step path:     {}", self.step_path)?;
        writeln!(f, "  step name:     {}", self.step_name)?;
        writeln!(f, "  step version:  {}", self.step_version)?;
        writeln!(f, "  export method: {}", self.export_method)?;
        if self.columns.is_empty() {
            writeln!(f, "  columns:       {}", NOT_AVAILABLE)?;
        } else {
            writeln!(f, "  columns:")?;
            for column in &self.columns {
                writeln!(f, "    - {} ({})", column.name, column.column_type)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlens_core::{MetadataDocument, Step};

    fn graph() -> LineageGraph {
        LineageGraph::from(MetadataDocument::new(vec![
            FileNode::new("a", "sales.csv")
                .with_type("csv")
                .with_step(Step::new("data/clean").named("clean").versioned("v3"))
                .with_columns(vec![Column::new("amount", "float64")])
                .with_inputs(["raw"]),
            FileNode::new("bare", ""),
        ]))
    }

    #[test]
    fn test_full_details() {
        let details = graph().details("a").unwrap();

        assert_eq!(details.name, "sales.csv");
        assert_eq!(details.step_path, "data/clean");
        assert_eq!(details.step_name, "clean");
        assert_eq!(details.step_version, "v3");
        assert_eq!(details.export_method, NOT_AVAILABLE);
        assert_eq!(details.inputs, vec!["raw"]);
    }

    #[test]
    fn test_malformed_node_uses_placeholders() {
        let details = graph().details("bare").unwrap();

        assert_eq!(details.name, NOT_AVAILABLE);
        assert_eq!(details.step_path, NOT_AVAILABLE);
        assert_eq!(details.step_name, NOT_AVAILABLE);
        assert_eq!(details.step_version, NOT_AVAILABLE);
        assert!(details.columns.is_empty());
        assert!(details.to_html().contains("<p>N/A</p>"));
    }

    #[test]
    fn test_unknown_id() {
        let g = graph();
        let details = g.details("ghost");
        assert!(details.is_none());
        assert!(details_html(details.as_ref(), "ghost").contains("No file found with id ghost"));
    }

    #[test]
    fn test_html_escapes_values() {
        let g = LineageGraph::from(MetadataDocument::new(vec![FileNode::new(
            "x",
            "<script>alert('x')</script>",
        )]));
        let html = g.details("x").unwrap().to_html();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_text_rendering() {
        let text = graph().details("a").unwrap().to_string();
        assert!(text.starts_with("sales.csv\n"));
        assert!(text.contains("- amount (float64)"));
    }
}
