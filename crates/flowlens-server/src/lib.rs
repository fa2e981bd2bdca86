//! Flowlens Server - session controller and WebSocket server
//!
//! This crate keeps one metadata document loaded, runs the view cycle
//! whenever the selection or settings change, and pushes the result to
//! every connected renderer.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - JSON-RPC 2.0 messages
//! - Pushed view updates after every cycle
//! - Refreshing from a file, an HTTP URL or an in-memory document
//! - File watching with debounced refresh

mod handlers;
mod protocol;
mod server;
mod session;
mod source;
mod watcher;

pub use handlers::SharedSession;
pub use protocol::{
    ConfigureParams, NodeParams, Request, Response, RpcError, FETCH_FAILED, INVALID_PARAMS,
    METHOD_NOT_FOUND, NODE_NOT_FOUND, NO_DOCUMENT, PARSE_ERROR,
};
pub use server::{process_message, FlowlensServer, ServerConfig, DEFAULT_PORT};
pub use session::{
    run_cycle, BroadcastMessage, CycleOutput, FetchFailedPayload, SessionController,
    SessionError, SessionInfo, UpdateReason, ViewUpdatePayload,
};
pub use source::{source_for, DocumentSource, FileSource, HttpSource, SourceError, StaticSource};
pub use watcher::{watch_document, WatchConfig};
