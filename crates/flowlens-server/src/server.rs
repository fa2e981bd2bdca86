//! WebSocket server implementation.
//!
//! Handles client connections, routes requests to handlers and forwards
//! session broadcasts to every client.

use crate::handlers::{
    handle_configure, handle_details, handle_info, handle_refresh, handle_select, handle_view,
    SharedSession,
};
use crate::protocol::{ConfigureParams, NodeParams, Request, Response};
use crate::session::{BroadcastMessage, SessionController, UpdateReason, ViewUpdatePayload};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default port of the session server.
pub const DEFAULT_PORT: u16 = 7450;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
        }
    }
}

/// The Flowlens WebSocket server.
pub struct FlowlensServer {
    config: ServerConfig,
    session: SharedSession,
}

impl FlowlensServer {
    /// Creates a new server around a session.
    pub fn new(session: SessionController, config: ServerConfig) -> Self {
        Self {
            config,
            session: Arc::new(session),
        }
    }

    /// Returns a handle to the shared session.
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Runs the server, accepting connections forever.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Flowlens server listening on ws://{}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, session).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket connection.
///
/// The client first receives the current view, then both request
/// responses and broadcast updates on the same socket.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    session: SharedSession,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let conn = Uuid::new_v4();
    info!("WebSocket connection {} established with {}", conn, addr);

    let mut updates = session.subscribe();
    let (mut write, mut read) = ws_stream.split();

    if let Ok(output) = session.current().await {
        let snapshot = BroadcastMessage::ViewUpdate(ViewUpdatePayload {
            reason: UpdateReason::Loaded,
            timestamp: Utc::now().timestamp_millis(),
            output,
        });
        write
            .send(Message::Text(serde_json::to_string(&snapshot)?))
            .await?;
        debug!("Sent initial snapshot to {}", conn);
    }

    loop {
        tokio::select! {
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("Message error from {}: {}", conn, e);
                        break;
                    }
                    None => break,
                };

                if msg.is_close() {
                    debug!("Client {} disconnected", conn);
                    break;
                }

                if msg.is_ping() {
                    write.send(Message::Pong(msg.into_data())).await?;
                    continue;
                }

                if msg.is_text() {
                    let text = msg.to_text().unwrap_or("");
                    let response = process_message(text, session.clone()).await;
                    let json = serde_json::to_string(&response)?;
                    write.send(Message::Text(json)).await?;
                }
            }

            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        let json = serde_json::to_string(&update)?;
                        if write.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} updates", conn, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Connection closed: {} ({})", conn, addr);
    Ok(())
}

/// Processes a JSON-RPC message and returns a response.
pub async fn process_message(text: &str, session: SharedSession) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Processing method: {}", method);

    match method {
        "graph.info" => handle_info(session, id).await,

        "view.get" => handle_view(session, id).await,

        "node.select" => match serde_json::from_value::<NodeParams>(request.params) {
            Ok(params) => handle_select(session, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "node.details" => match serde_json::from_value::<NodeParams>(request.params) {
            Ok(params) => handle_details(session, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "session.configure" => {
            let params = if request.params.is_null() {
                Ok(ConfigureParams::default())
            } else {
                serde_json::from_value::<ConfigureParams>(request.params)
            };
            match params {
                Ok(params) => handle_configure(session, id, params).await,
                Err(e) => Response::invalid_params(id, e.to_string()),
            }
        }

        "document.refresh" => handle_refresh(session, id).await,

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{INVALID_PARAMS, METHOD_NOT_FOUND, NODE_NOT_FOUND, NO_DOCUMENT};
    use crate::source::StaticSource;
    use flowlens_core::{FileNode, MetadataDocument, Step};
    use flowlens_graph::ViewOptions;

    fn session() -> SharedSession {
        let doc = MetadataDocument::new(vec![
            FileNode::new("a", "a.csv").with_step(Step::new("data/load").named("load")),
            FileNode::new("b", "b.csv")
                .with_step(Step::new("data/clean").named("clean"))
                .with_inputs(["a"]),
            FileNode::new("c", "c.csv")
                .with_step(Step::new("data/report").named("report"))
                .with_inputs(["b"]),
        ]);
        Arc::new(SessionController::new(
            Box::new(StaticSource::new(doc)),
            ViewOptions::new(1),
        ))
    }

    async fn loaded() -> SharedSession {
        let session = session();
        session.load().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_parse_error() {
        let resp = process_message("{oops", session()).await;
        assert_eq!(resp.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = process_message(r#"{"jsonrpc":"2.0","id":1,"method":"nope"}"#, session()).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_view_before_load() {
        let resp = process_message(r#"{"id":1,"method":"view.get"}"#, session()).await;
        assert_eq!(resp.error.unwrap().code, NO_DOCUMENT);
    }

    #[tokio::test]
    async fn test_select_round_trip() {
        let session = loaded().await;
        let resp = process_message(
            r#"{"jsonrpc":"2.0","id":2,"method":"node.select","params":{"id":"b"}}"#,
            session,
        )
        .await;

        let result = resp.result.unwrap();
        assert_eq!(result["view"]["selected"], "b");
        assert_eq!(result["view"]["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(result["details"]["step_name"], "clean");
    }

    #[tokio::test]
    async fn test_select_missing_params() {
        let resp = process_message(r#"{"id":3,"method":"node.select"}"#, loaded().await).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let resp = process_message(
            r#"{"id":4,"method":"node.details","params":{"id":"ghost"}}"#,
            loaded().await,
        )
        .await;
        assert_eq!(resp.error.unwrap().code, NODE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_configure_and_info() {
        let session = loaded().await;
        process_message(r#"{"id":5,"method":"node.select","params":{"id":"b"}}"#, session.clone())
            .await;

        let resp = process_message(
            r#"{"id":6,"method":"session.configure","params":{"exclude_step":"report"}}"#,
            session.clone(),
        )
        .await;
        let nodes = resp.result.unwrap()["view"]["nodes"].as_array().unwrap().len();
        assert_eq!(nodes, 2);

        let info = process_message(r#"{"id":7,"method":"graph.info"}"#, session)
            .await
            .result
            .unwrap();
        assert_eq!(info["session"]["selected"], "b");
        assert_eq!(info["session"]["exclude_step"], "report");
        assert_eq!(info["session"]["node_count"], 3);
    }

    #[tokio::test]
    async fn test_refresh() {
        let resp = process_message(r#"{"id":8,"method":"document.refresh"}"#, loaded().await).await;
        assert!(!resp.is_error());
    }
}
