//! Minimal MCP (Model Context Protocol) server over stdio.
//!
//! Reads line-delimited JSON-RPC 2.0 from stdin and writes responses to
//! stdout. Exposes one tool:
//! - `generate`: renders a Mermaid diagram source string to a PNG raster and
//!   returns it inline or as a saved file path, depending on the
//!   deployment's output mode
//!
//! # Module layout
//!
//! - [`jsonrpc`] — JSON-RPC 2.0 wire types, response helpers, and stdout framing
//! - [`settings`] — process-wide output-mode configuration
//! - [`tools`] — tool registration, descriptors, and dispatch
//! - [`tools::generate`] — the `generate` tool handler

pub mod jsonrpc;
pub mod settings;
pub mod tools;

use std::io::{self, BufRead};

use jsonrpc::{
    IncomingMessage, invalid_params, method_not_found, parse_error, send_response,
    success_response,
};
use mmdshot_render::Rasterizer;
use settings::Settings;
use tools::{ToolContext, handle_tools_call, handle_tools_list};

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// MCP protocol version.
pub(crate) const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during initialization.
pub(crate) const SERVER_NAME: &str = "mmdshot";

/// Server version reported during initialization.
pub(crate) const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handle the `initialize` JSON-RPC request.
fn handle_initialize() -> serde_json::Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Run the MCP server loop until stdin closes.
///
/// Every per-request failure is recovered into a structured response; the
/// only error this returns is a broken stdio transport, which callers
/// should treat as fatal.
pub fn run_mcp_server(settings: &Settings, rasterizer: &dyn Rasterizer) -> io::Result<()> {
    log::info!(
        "starting {SERVER_NAME} MCP server v{SERVER_VERSION} ({} mode)",
        settings.output_mode
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = stdin.lock();
    let ctx = ToolContext {
        settings,
        rasterizer,
    };

    for line in reader.lines() {
        let line = line?;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        log::debug!("<- {trimmed}");

        let msg: IncomingMessage = match serde_json::from_str(trimmed) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("parse error: {e}");
                send_response(&mut stdout, &parse_error());
                continue;
            }
        };

        let method = match &msg.method {
            Some(m) => m.as_str(),
            None => {
                // Not a request or notification we handle.
                log::warn!("ignoring message without method");
                continue;
            }
        };

        // Notifications (no id) never get a response.
        let id = match msg.id {
            Some(id) => id,
            None => {
                log::debug!("notification: {method}");
                continue;
            }
        };

        let response = match method {
            "initialize" => success_response(id, handle_initialize()),
            "tools/list" => success_response(id, handle_tools_list(ctx.settings)),
            "tools/call" => match handle_tools_call(&ctx, msg.params) {
                Ok(result) => success_response(id, result),
                Err(reason) => invalid_params(id, &reason.to_string()),
            },
            _ => method_not_found(id, method),
        };

        log::debug!(
            "-> {}",
            serde_json::to_string(&response).unwrap_or_else(|_| "<serialization error>".into())
        );

        send_response(&mut stdout, &response);
    }

    log::info!("stdin closed, exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use settings::OutputMode;
    use testutil::MockRasterizer;

    #[test]
    fn initialize_reports_server_info() {
        let result = handle_initialize();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["serverInfo"]["version"], SERVER_VERSION);
    }

    #[test]
    fn tools_list_has_one_generate_tool() {
        let result = handle_tools_list(&Settings::default());
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "generate");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[test]
    fn tools_list_requires_only_code_in_inline_mode() {
        let result = handle_tools_list(&Settings {
            output_mode: OutputMode::Inline,
        });
        let required = result["tools"][0]["inputSchema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required, &[serde_json::json!("code")]);
    }

    #[test]
    fn tools_list_requires_name_and_folder_in_file_mode() {
        let result = handle_tools_list(&Settings {
            output_mode: OutputMode::SaveToDisk,
        });
        let required: Vec<_> = result["tools"][0]["inputSchema"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, ["code", "name", "folder"]);
    }

    #[test]
    fn tools_call_unknown_tool_is_a_tool_error() {
        let settings = Settings::default();
        let mock = MockRasterizer::ok();
        let ctx = ToolContext {
            settings: &settings,
            rasterizer: &mock,
        };
        let result = handle_tools_call(
            &ctx,
            Some(serde_json::json!({ "name": "nonexistent_tool", "arguments": {} })),
        )
        .unwrap();
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Unknown tool")
        );
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn tools_call_missing_params_is_invalid() {
        let settings = Settings::default();
        let mock = MockRasterizer::ok();
        let ctx = ToolContext {
            settings: &settings,
            rasterizer: &mock,
        };
        let err = handle_tools_call(&ctx, None).unwrap_err();
        assert!(err.to_string().contains("missing params"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn tools_call_generate_round_trip() {
        let settings = Settings::default();
        let mock = MockRasterizer::ok();
        let ctx = ToolContext {
            settings: &settings,
            rasterizer: &mock,
        };
        let result = handle_tools_call(
            &ctx,
            Some(serde_json::json!({
                "name": "generate",
                "arguments": { "code": "graph TD; A-->B" }
            })),
        )
        .unwrap();
        assert!(result.get("isError").is_none());
        assert_eq!(result["content"][0]["type"], "image");
        assert_eq!(mock.calls(), 1);
    }
}
