//! Session controller.
//!
//! Owns the one piece of mutable state the viewer has: which file is
//! selected, together with the depth and step exclusion it is viewed
//! with, and the graph built from the last successful fetch.
//!
//! Every state change runs a full cycle (resolve the neighborhood, build
//! the view, present the details) while holding the write lock, so two
//! cycles never interleave. Fetches happen outside the lock; whichever
//! fetch completes last is the one installed.

use crate::source::{DocumentSource, SourceError};
use chrono::Utc;
use flowlens_graph::{details_html, LineageGraph, NeighborhoodView, NodeDetails, ViewOptions};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Errors returned by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocument,

    #[error("document fetch failed: {0}")]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Everything a renderer needs after one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutput {
    pub view: NeighborhoodView,
    /// `None` when the selected id is not in the document.
    pub details: Option<NodeDetails>,
    pub details_html: String,
}

/// Why a view update was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    Loaded,
    Selected,
    Configured,
    Refreshed,
    FileChanged,
}

/// Messages pushed to every connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BroadcastMessage {
    /// A new cycle output replaced the current view.
    ViewUpdate(ViewUpdatePayload),
    /// A refresh failed; the current view stays on screen.
    FetchFailed(FetchFailedPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewUpdatePayload {
    pub reason: UpdateReason,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(flatten)]
    pub output: CycleOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailedPayload {
    pub source: String,
    pub message: String,
    pub timestamp: i64,
}

/// Snapshot of the session for the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub source: String,
    pub loaded: bool,
    pub loaded_at: Option<String>,
    pub node_count: usize,
    pub edge_count: usize,
    pub selected: Option<String>,
    pub depth: usize,
    pub exclude_step: Option<String>,
}

#[derive(Default)]
struct SessionState {
    graph: Option<Arc<LineageGraph>>,
    selected: Option<String>,
    options: ViewOptions,
    loaded_at: Option<chrono::DateTime<Utc>>,
}

impl SessionState {
    fn cycle(&self) -> Result<CycleOutput> {
        let graph = self.graph.as_ref().ok_or(SessionError::NoDocument)?;
        let selected = self.selected.as_deref().unwrap_or_default();
        Ok(run_cycle(graph, selected, &self.options))
    }
}

/// Resolves, builds and presents one view.
pub fn run_cycle(graph: &LineageGraph, selected: &str, options: &ViewOptions) -> CycleOutput {
    let view = graph.build_view(selected, options);
    let details = graph.details(selected);
    let details_html = details_html(details.as_ref(), selected);

    debug!(
        "Cycle for {}: {} nodes, {} edges",
        selected,
        view.nodes.len(),
        view.edges.len()
    );

    CycleOutput {
        view,
        details,
        details_html,
    }
}

/// Drives load, select, configure and refresh cycles for one document.
pub struct SessionController {
    source: Box<dyn DocumentSource>,
    state: RwLock<SessionState>,
    updates: broadcast::Sender<BroadcastMessage>,
}

impl SessionController {
    /// Creates a controller. Nothing is fetched until [`load`](Self::load).
    pub fn new(source: Box<dyn DocumentSource>, options: ViewOptions) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            source,
            state: RwLock::new(SessionState {
                options,
                ..Default::default()
            }),
            updates,
        }
    }

    /// Location of the document source.
    pub fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    /// Returns a receiver for pushed updates.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.updates.subscribe()
    }

    /// Fetches the document and selects its first file.
    pub async fn load(&self) -> Result<CycleOutput> {
        let graph = self.fetch().await?;
        let file_count = graph.node_count();
        let mut state = self.state.write().await;

        state.selected = graph.first().map(|f| f.uuid.clone());
        state.graph = Some(graph);
        state.loaded_at = Some(Utc::now());

        let output = state.cycle()?;
        drop(state);

        info!("Loaded {} ({} files)", self.source.describe(), file_count);
        self.publish(UpdateReason::Loaded, &output);
        Ok(output)
    }

    /// Re-fetches the document and re-runs the cycle for the current
    /// selection. On failure the previous document stays in place.
    pub async fn refresh(&self) -> Result<CycleOutput> {
        self.refresh_because(UpdateReason::Refreshed).await
    }

    pub(crate) async fn refresh_because(&self, reason: UpdateReason) -> Result<CycleOutput> {
        let graph = match self.fetch().await {
            Ok(graph) => graph,
            Err(e) => {
                warn!("Refresh of {} failed, keeping previous view: {}", self.source.describe(), e);
                let _ = self.updates.send(BroadcastMessage::FetchFailed(FetchFailedPayload {
                    source: self.source.describe(),
                    message: e.to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                }));
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if state.selected.is_none() {
            state.selected = graph.first().map(|f| f.uuid.clone());
        }
        state.graph = Some(graph);
        state.loaded_at = Some(Utc::now());

        let output = state.cycle()?;
        drop(state);

        self.publish(reason, &output);
        Ok(output)
    }

    /// Selects a file, as a click in the renderer does.
    ///
    /// An unknown id is not an error: the view comes back empty and the
    /// details report no match.
    pub async fn select(&self, id: &str) -> Result<CycleOutput> {
        let mut state = self.state.write().await;
        if state.graph.is_none() {
            return Err(SessionError::NoDocument);
        }
        state.selected = Some(id.to_owned());

        let output = state.cycle()?;
        drop(state);

        debug!("Selected {}", id);
        self.publish(UpdateReason::Selected, &output);
        Ok(output)
    }

    /// Changes the depth and/or excluded step.
    ///
    /// `None` leaves a setting unchanged; an empty step name clears the
    /// exclusion.
    pub async fn configure(
        &self,
        depth: Option<usize>,
        exclude_step: Option<String>,
    ) -> Result<CycleOutput> {
        let mut state = self.state.write().await;
        if let Some(depth) = depth {
            state.options.depth = depth;
        }
        if let Some(step) = exclude_step {
            state.options = state.options.clone().excluding(step);
        }

        let output = state.cycle()?;
        drop(state);

        self.publish(UpdateReason::Configured, &output);
        Ok(output)
    }

    /// The output of the current state, without changing anything.
    pub async fn current(&self) -> Result<CycleOutput> {
        self.state.read().await.cycle()
    }

    /// Details of any file in the loaded document.
    pub async fn details(&self, id: &str) -> Result<Option<NodeDetails>> {
        let state = self.state.read().await;
        let graph = state.graph.as_ref().ok_or(SessionError::NoDocument)?;
        Ok(graph.details(id))
    }

    /// A snapshot of the session.
    pub async fn info(&self) -> SessionInfo {
        let state = self.state.read().await;
        let stats = state.graph.as_ref().map(|g| g.stats());
        SessionInfo {
            source: self.source.describe(),
            loaded: state.graph.is_some(),
            loaded_at: state.loaded_at.map(|t| t.to_rfc3339()),
            node_count: stats.as_ref().map_or(0, |s| s.node_count),
            edge_count: stats.as_ref().map_or(0, |s| s.edge_count),
            selected: state.selected.clone(),
            depth: state.options.depth,
            exclude_step: state.options.exclude_step.clone(),
        }
    }

    async fn fetch(&self) -> Result<Arc<LineageGraph>> {
        let document = self.source.fetch().await?;
        Ok(Arc::new(LineageGraph::from(document)))
    }

    fn publish(&self, reason: UpdateReason, output: &CycleOutput) {
        // No subscribers is fine.
        let _ = self.updates.send(BroadcastMessage::ViewUpdate(ViewUpdatePayload {
            reason,
            timestamp: Utc::now().timestamp_millis(),
            output: output.clone(),
        }));
    }
}
