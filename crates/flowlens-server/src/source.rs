//! Where metadata documents come from.
//!
//! A source is fetched once when a session loads and again on every
//! refresh. Each fetch returns a complete document; nothing is cached
//! between fetches.

use async_trait::async_trait;
use flowlens_core::{DocumentError, MetadataDocument};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while fetching a document.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A fetchable metadata document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Local file backing this source, if any. Used for watching.
    fn local_path(&self) -> Option<&Path> {
        None
    }

    /// Fetches and parses the current document.
    async fn fetch(&self) -> Result<MetadataDocument, SourceError>;
}

/// A document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn local_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn fetch(&self) -> Result<MetadataDocument, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(MetadataDocument::from_slice(&bytes)?)
    }
}

/// A document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<MetadataDocument, SourceError> {
        let http_err = |source| SourceError::Http {
            url: self.url.clone(),
            source,
        };

        let response = self.client.get(&self.url).send().await.map_err(http_err)?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(http_err)?;
        debug!("Fetched {} bytes from {}", bytes.len(), self.url);
        Ok(MetadataDocument::from_slice(&bytes)?)
    }
}

/// A document held in memory. Every fetch returns a copy.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    document: MetadataDocument,
}

impl StaticSource {
    pub fn new(document: MetadataDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn describe(&self) -> String {
        format!("<in-memory document, {} files>", self.document.len())
    }

    async fn fetch(&self) -> Result<MetadataDocument, SourceError> {
        Ok(self.document.clone())
    }
}

/// Picks a source for a location: `http(s)://` URLs are fetched over the
/// network, anything else is read from disk.
pub fn source_for(location: &str) -> Box<dyn DocumentSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(FileSource::new(location))
    }
}
