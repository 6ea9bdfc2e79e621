//! JSON-RPC 2.0 wire types and response helpers.
//!
//! The minimal surface needed to serve MCP over stdio: incoming message
//! deserialization, outgoing response serialization, the standard error
//! constructors, and newline-delimited framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// JSON-RPC error code for malformed JSON.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for invalid request arguments.
pub const INVALID_PARAMS: i64 = -32602;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// An incoming JSON-RPC 2.0 message from the client.
///
/// Requests carry an `id`; notifications do not and never get a response.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[allow(dead_code)] // Required by the JSON-RPC envelope; never read.
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ---------------------------------------------------------------------------
// Response constructors
// ---------------------------------------------------------------------------

/// Build a success response.
pub fn success_response(id: Value, result: Value) -> Response {
    Response {
        jsonrpc: "2.0",
        result: Some(result),
        error: None,
        id,
    }
}

/// Build an error response with the given code and message.
pub fn error_response(id: Value, code: i64, message: String) -> Response {
    Response {
        jsonrpc: "2.0",
        result: None,
        error: Some(RpcError {
            code,
            message,
            data: None,
        }),
        id,
    }
}

/// Build a method-not-found error response.
pub fn method_not_found(id: Value, method: &str) -> Response {
    error_response(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
}

/// Build an invalid-params error response (argument validation failures).
pub fn invalid_params(id: Value, message: &str) -> Response {
    error_response(id, INVALID_PARAMS, format!("Invalid params: {message}"))
}

/// Build a parse error response.
pub fn parse_error() -> Response {
    error_response(Value::Null, PARSE_ERROR, "Parse error".to_string())
}

// ---------------------------------------------------------------------------
// I/O helper
// ---------------------------------------------------------------------------

/// Send a JSON-RPC response to a writer as a single newline-terminated line.
pub fn send_response(out: &mut impl Write, response: &Response) {
    match serde_json::to_string(response) {
        Ok(json) => {
            if let Err(e) = writeln!(out, "{json}") {
                log::error!("failed to write response: {e}");
            }
            if let Err(e) = out.flush() {
                log::error!("failed to flush stdout: {e}");
            }
        }
        Err(e) => {
            log::error!("failed to serialize response: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
