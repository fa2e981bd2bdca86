//! Flowlens Core - Pipeline metadata model
//!
//! This crate defines the document a data pipeline writes next to its
//! outputs: every file, the step that produced it, its columns and the
//! files it was derived from. Higher layers build a graph from it.
//!
//! # Example
//!
//! ```no_run
//! use flowlens_core::MetadataDocument;
//!
//! let doc = MetadataDocument::from_path("data/report/metadata.json").unwrap();
//! for file in doc.terminal_outputs() {
//!     println!("{} ({})", file.name, file.uuid);
//! }
//! ```

mod document;
mod error;
mod node;

pub use document::{MetadataDocument, METADATA_FILE_NAME};
pub use error::{DocumentError, Result};
pub use node::{Column, FileNode, InputRef, Step, NOT_AVAILABLE};
