//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const NODE_NOT_FOUND: i32 = -32001;
pub const NO_DOCUMENT: i32 = -32002;
pub const FETCH_FAILED: i32 = -32003;

/// An incoming request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

/// An error object inside a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response to a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

impl Response {
    /// A successful response. Falls back to an internal error if the
    /// result cannot be serialized.
    pub fn success(id: Option<Value>, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: jsonrpc_version(),
                result: Some(value),
                error: None,
                id,
            },
            Err(e) => Self::error(id, -32603, format!("Internal error: {}", e)),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, message)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Parameters of `node.select` and `node.details`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeParams {
    pub id: String,
}

/// Parameters of `session.configure`.
///
/// `depth` is signed because the page's numeric control is; anything
/// below zero means "selected node only".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigureParams {
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub exclude_step: Option<String>,
}

impl ConfigureParams {
    pub fn depth(&self) -> Option<usize> {
        self.depth.map(|d| usize::try_from(d).unwrap_or(0))
    }
}
