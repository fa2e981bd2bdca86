//! Project configuration.
//!
//! Settings are read from `.flowlens/config.json` in the working
//! directory, falling back to the user config directory. Command-line
//! flags override whatever is loaded.

use flowlens_graph::DEFAULT_DEPTH;
use flowlens_server::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_DIR: &str = ".flowlens";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Path or URL of the metadata document.
    pub document: String,
    pub depth: usize,
    pub exclude_step: Option<String>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            document: flowlens_core::METADATA_FILE_NAME.to_string(),
            depth: DEFAULT_DEPTH,
            exclude_step: None,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Loads the config for the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let user = dirs::config_dir().map(|d| d.join("flowlens").join(CONFIG_FILE));
        Self::discover(&cwd, user.as_deref())
    }

    /// Uses the project config under `dir` if there is one, then the
    /// user config, then the defaults.
    pub fn discover(dir: &Path, user_config: Option<&Path>) -> Result<Self, ConfigError> {
        let project = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if project.is_file() {
            return Self::from_file(&project);
        }

        match user_config {
            Some(path) if path.is_file() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
