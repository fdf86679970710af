//! JSON-RPC 2.0 message types for the stdio transport.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// An incoming request, or a notification when `id` is absent
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// `None` only when the member is absent; `"id": null` is `Some(Null)`
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Outgoing response; exactly one of `result` and `error` is set
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Outcome of decoding one line from the wire
#[derive(Debug)]
pub enum Incoming {
    Request(JsonRpcRequest),
    /// Undecodable line; the response to send back
    Invalid(JsonRpcResponse),
}

/// Decode one newline-delimited frame; invalid UTF-8 is a parse error.
pub fn decode(frame: &[u8]) -> Incoming {
    let value: Value = match serde_json::from_slice(frame) {
        Ok(value) => value,
        Err(e) => {
            return Incoming::Invalid(JsonRpcResponse::failure(
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("parse error: {}", e)),
            ));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => Incoming::Request(request),
        Ok(request) => Incoming::Invalid(JsonRpcResponse::failure(
            id,
            RpcError::new(
                INVALID_REQUEST,
                format!("unsupported jsonrpc version: {}", request.jsonrpc),
            ),
        )),
        Err(e) => Incoming::Invalid(JsonRpcResponse::failure(
            id,
            RpcError::new(INVALID_REQUEST, format!("invalid request: {}", e)),
        )),
    }
}
