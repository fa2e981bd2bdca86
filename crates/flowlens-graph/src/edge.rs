//! Edge type handed to renderers.
//!
//! Every edge points from an input file to the file derived from it.

use serde::{Deserialize, Serialize};

/// An input edge between two files in a view.
///
/// Field names follow the `from`/`to` convention most browser graph
/// libraries accept directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Id of the input file.
    pub from: String,
    /// Id of the dependent file.
    pub to: String,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
