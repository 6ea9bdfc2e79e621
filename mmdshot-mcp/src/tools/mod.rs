//! Tool registration, descriptors, and dispatch for the MCP server.
//!
//! Owns the tool registry: builds the `tools/list` response and dispatches
//! `tools/call` requests to the per-tool handler. Argument validation
//! failures surface as JSON-RPC invalid-params errors before any rendering
//! resource is acquired; failures during rendering become tool results with
//! `isError` set.

pub mod generate;

use crate::settings::Settings;
use mmdshot_render::{Rasterizer, Theme};
use serde_json::Value;
use std::fmt;

pub use generate::handle_generate;

/// Everything a tool handler needs for one call.
pub struct ToolContext<'a> {
    pub settings: &'a Settings,
    pub rasterizer: &'a dyn Rasterizer,
}

/// A tool argument problem, detected before any rendering resource is
/// acquired. The server loop maps this to JSON-RPC invalid params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArguments(pub String);

impl fmt::Display for InvalidArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidArguments {}

// ---------------------------------------------------------------------------
// Tool descriptors
// ---------------------------------------------------------------------------

/// Build the input schema for the `generate` tool.
///
/// `name` and `folder` are only required when the deployment saves rasters
/// to disk.
fn generate_input_schema(settings: &Settings) -> Value {
    let mut required = vec!["code"];
    if settings.saves_to_disk() {
        required.push("name");
        required.push("folder");
    }
    serde_json::json!({
        "type": "object",
        "properties": {
            "code": {
                "type": "string",
                "description": "Mermaid diagram source to render"
            },
            "theme": {
                "type": "string",
                "enum": Theme::NAMES,
                "description": "Mermaid theme (default: default)"
            },
            "backgroundColor": {
                "type": "string",
                "description": "Page background behind the diagram, e.g. 'white' or '#F0F0F0' (default: transparent)"
            },
            "name": {
                "type": "string",
                "description": "Filename (without extension) for the saved PNG"
            },
            "folder": {
                "type": "string",
                "description": "Absolute path of an existing directory to save the PNG in"
            }
        },
        "required": required
    })
}

/// Build the tool descriptor for `generate`.
fn generate_tool(settings: &Settings) -> Value {
    serde_json::json!({
        "name": "generate",
        "description": "Render a Mermaid diagram from source text to a PNG image. Supports flowcharts, sequence diagrams, class diagrams, state diagrams, and every other diagram type the Mermaid library understands.",
        "inputSchema": generate_input_schema(settings)
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Handle the `tools/list` request.
pub fn handle_tools_list(settings: &Settings) -> Value {
    serde_json::json!({
        "tools": [generate_tool(settings)]
    })
}

/// Handle the `tools/call` request.
///
/// `Err` means the arguments never passed validation; the server loop turns
/// it into a JSON-RPC invalid-params error. `Ok` carries a tool result,
/// which may still describe a rendering failure via `isError`.
pub fn handle_tools_call(
    ctx: &ToolContext<'_>,
    params: Option<Value>,
) -> Result<Value, InvalidArguments> {
    let params =
        params.ok_or_else(|| InvalidArguments("missing params for tools/call".to_string()))?;

    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    match name {
        "generate" => handle_generate(ctx, &params),
        _ => Ok(tool_error(&format!("Unknown tool: {name}"))),
    }
}

// ---------------------------------------------------------------------------
// Error helper (shared by tool handlers in submodules)
// ---------------------------------------------------------------------------

/// Build a tool error result.
pub fn tool_error(message: &str) -> Value {
    serde_json::json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": message
        }]
    })
}
