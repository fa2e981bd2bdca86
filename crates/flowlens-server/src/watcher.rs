//! Refreshes a session when its document changes on disk.

use crate::handlers::SharedSession;
use crate::session::UpdateReason;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// File watcher configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// The document file to watch.
    pub path: PathBuf,
    /// Quiet period after the last change before refreshing.
    pub debounce_ms: u64,
}

impl WatchConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(flowlens_core::METADATA_FILE_NAME),
            debounce_ms: 250,
        }
    }
}

/// Watches the document and refreshes the session after each burst of
/// writes. Runs until the watcher channel closes.
///
/// The parent directory is watched rather than the file so that editors
/// which replace the file on save are still picked up.
pub async fn watch_document(config: WatchConfig, session: SharedSession) -> notify::Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::channel::<notify::Result<Event>>(256);

    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = notify_tx.blocking_send(res);
        },
        Config::default(),
    )?;

    let dir = watch_dir(&config.path);
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for changes", config.path.display());

    let mut pending: Option<Instant> = None;
    let debounce = Duration::from_millis(config.debounce_ms);

    loop {
        if let Some(since) = pending {
            if since.elapsed() >= debounce {
                pending = None;
                debug!("{} changed, refreshing", config.path.display());
                // Failures are already logged and broadcast by the session.
                let _ = session.refresh_because(UpdateReason::FileChanged).await;
            }
        }

        match tokio::time::timeout(Duration::from_millis(50), notify_rx.recv()).await {
            Ok(Some(Ok(event))) => {
                if event.paths.iter().any(|p| is_document_event(p, &config.path)) {
                    pending = Some(Instant::now());
                }
            }
            Ok(Some(Err(e))) => {
                warn!("Watch error: {}", e);
            }
            Ok(None) => break,
            Err(_) => {}
        }
    }

    Ok(())
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether a filesystem event path refers to the watched document.
///
/// Event paths are usually absolute while the configured path may be
/// relative, so only the file names are compared.
fn is_document_event(path: &Path, target: &Path) -> bool {
    match (path.file_name(), target.file_name()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
