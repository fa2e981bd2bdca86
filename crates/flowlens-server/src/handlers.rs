//! Request handlers for protocol methods.
//!
//! Each handler implements one method of the session protocol.

use crate::protocol::{
    ConfigureParams, NodeParams, Response, FETCH_FAILED, NODE_NOT_FOUND, NO_DOCUMENT,
};
use crate::session::{CycleOutput, SessionController, SessionError};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared session across connections.
pub type SharedSession = Arc<SessionController>;

fn cycle_response(id: Option<Value>, result: Result<CycleOutput, SessionError>) -> Response {
    match result {
        Ok(output) => Response::success(id, output),
        Err(e) => session_error(id, e),
    }
}

fn session_error(id: Option<Value>, error: SessionError) -> Response {
    let code = match error {
        SessionError::NoDocument => NO_DOCUMENT,
        SessionError::Source(_) => FETCH_FAILED,
    };
    Response::error(id, code, error.to_string())
}

/// Handles the graph.info method.
pub async fn handle_info(session: SharedSession, id: Option<Value>) -> Response {
    let info = session.info().await;

    Response::success(
        id,
        serde_json::json!({
            "session": info,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Handles the view.get method.
pub async fn handle_view(session: SharedSession, id: Option<Value>) -> Response {
    cycle_response(id, session.current().await)
}

/// Handles the node.select method.
pub async fn handle_select(
    session: SharedSession,
    id: Option<Value>,
    params: NodeParams,
) -> Response {
    debug!("Select: {}", params.id);
    cycle_response(id, session.select(&params.id).await)
}

/// Handles the node.details method.
pub async fn handle_details(
    session: SharedSession,
    id: Option<Value>,
    params: NodeParams,
) -> Response {
    match session.details(&params.id).await {
        Ok(Some(details)) => Response::success(
            id,
            serde_json::json!({
                "details": details,
                "html": details.to_html(),
            }),
        ),
        Ok(None) => Response::error(id, NODE_NOT_FOUND, format!("Node not found: {}", params.id)),
        Err(e) => session_error(id, e),
    }
}

/// Handles the session.configure method.
pub async fn handle_configure(
    session: SharedSession,
    id: Option<Value>,
    params: ConfigureParams,
) -> Response {
    debug!(
        "Configure: depth={:?} exclude_step={:?}",
        params.depth, params.exclude_step
    );
    cycle_response(
        id,
        session.configure(params.depth(), params.exclude_step).await,
    )
}

/// Handles the document.refresh method.
pub async fn handle_refresh(session: SharedSession, id: Option<Value>) -> Response {
    cycle_response(id, session.refresh().await)
}
