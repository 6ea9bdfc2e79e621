//! Handler for the `generate` MCP tool.
//!
//! Validates the request arguments, drives the rendering adapter, and shapes
//! the outcome into MCP content blocks. The deployment's output mode decides
//! between inline image bytes and a saved file path.

use super::{InvalidArguments, ToolContext, tool_error};
use crate::settings::OutputMode;
use mmdshot_render::{Raster, RenderError, RenderRequest, Theme};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Substrings (lowercase) marking a failure as a diagram syntax problem.
const SYNTAX_ERROR_MARKERS: [&str; 3] = ["syntax error", "parse error", "lexical error"];

/// Execute the `generate` tool.
pub fn handle_generate(ctx: &ToolContext<'_>, params: &Value) -> Result<Value, InvalidArguments> {
    let arguments = params
        .get("arguments")
        .ok_or_else(|| InvalidArguments("missing 'arguments' in tools/call params".to_string()))?;

    // All validation happens before the rasterizer is touched, so a doomed
    // request never acquires a browser session.
    let request = parse_request(arguments)?;
    let target = match ctx.settings.output_mode {
        OutputMode::Inline => None,
        OutputMode::SaveToDisk => Some(parse_save_target(arguments)?),
    };

    log::info!(
        "generate: {} byte source, theme {}",
        request.source.len(),
        request.theme
    );

    Ok(match (ctx.rasterizer.rasterize(&request), target) {
        (Ok(raster), None) => inline_result(&raster),
        (Ok(raster), Some(target)) => file_result(&raster, &target),
        (Err(err), _) => failure_result(&err),
    })
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

/// Validate the rendering arguments shared by both output modes.
fn parse_request(arguments: &Value) -> Result<RenderRequest, InvalidArguments> {
    if !arguments.is_object() {
        return Err(InvalidArguments("'arguments' must be an object".to_string()));
    }

    let source = match arguments.get("code") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            return Err(InvalidArguments("'code' must not be empty".to_string()));
        }
        Some(_) => return Err(InvalidArguments("'code' must be a string".to_string())),
        None => return Err(InvalidArguments("missing required 'code' argument".to_string())),
    };

    let theme = match arguments.get("theme") {
        Some(Value::String(s)) => s
            .parse::<Theme>()
            .map_err(|e| InvalidArguments(e.to_string()))?,
        Some(_) => return Err(InvalidArguments("'theme' must be a string".to_string())),
        None => Theme::Default,
    };

    let background = match arguments.get("backgroundColor") {
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || !is_safe_css_color(s) {
                return Err(InvalidArguments(format!(
                    "'backgroundColor' is not a usable CSS color: {s:?}"
                )));
            }
            Some(s.to_string())
        }
        Some(_) => {
            return Err(InvalidArguments(
                "'backgroundColor' must be a string".to_string(),
            ));
        }
        None => None,
    };

    Ok(RenderRequest {
        source,
        theme,
        background,
    })
}

/// Where a file-mode raster gets written.
struct SaveTarget {
    path: PathBuf,
}

/// Validate `name` and `folder`, required only in save-to-disk deployments.
fn parse_save_target(arguments: &Value) -> Result<SaveTarget, InvalidArguments> {
    let name = match arguments.get("name") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(InvalidArguments("'name' must be a string".to_string())),
        None => {
            return Err(InvalidArguments(
                "missing required 'name' argument (required in file-saving mode)".to_string(),
            ));
        }
    };
    if !is_safe_file_stem(&name) {
        return Err(InvalidArguments(format!(
            "'name' is not a safe filename fragment: {name:?}"
        )));
    }

    let folder = match arguments.get("folder") {
        Some(Value::String(s)) => PathBuf::from(s),
        Some(_) => return Err(InvalidArguments("'folder' must be a string".to_string())),
        None => {
            return Err(InvalidArguments(
                "missing required 'folder' argument (required in file-saving mode)".to_string(),
            ));
        }
    };
    if !folder.is_dir() {
        return Err(InvalidArguments(format!(
            "'folder' is not an existing directory: {}",
            folder.display()
        )));
    }

    Ok(SaveTarget {
        path: folder.join(format!("{name}.png")),
    })
}

/// A filename fragment that cannot traverse or escape the target folder.
fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// The charset accepted for background values interpolated into the shell
/// document: named colors, hex values, and rgb()/hsl() notations.
fn is_safe_css_color(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'))
}

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// Wrap raster bytes as an inline MCP image block plus a confirmation line.
fn inline_result(raster: &Raster) -> Value {
    use base64::Engine;
    let data = base64::engine::general_purpose::STANDARD.encode(&raster.png);
    serde_json::json!({
        "content": [
            {
                "type": "image",
                "mimeType": "image/png",
                "data": data
            },
            {
                "type": "text",
                "text": format!("Rendered diagram ({}x{}).", raster.width, raster.height)
            }
        ]
    })
}

/// Persist the raster and answer with the resulting path.
fn file_result(raster: &Raster, target: &SaveTarget) -> Value {
    if let Err(e) = write_png_atomic(&raster.png, &target.path) {
        return tool_error(&format!(
            "Failed to save diagram to {}: {e}",
            target.path.display()
        ));
    }
    log::info!(
        "generate: saved {}x{} png to {}",
        raster.width,
        raster.height,
        target.path.display()
    );
    serde_json::json!({
        "content": [{
            "type": "text",
            "text": target.path.display().to_string()
        }]
    })
}

/// Write PNG bytes to a sibling temp file, then rename into place.
fn write_png_atomic(bytes: &[u8], path: &Path) -> std::io::Result<()> {
    let temp_path = path.with_extension("png.tmp");
    std::fs::File::create(&temp_path).and_then(|mut f| f.write_all(bytes))?;
    std::fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}

/// Shape a rendering failure into a text-only error result.
fn failure_result(err: &RenderError) -> Value {
    let mut text = if is_syntax_failure(err) {
        format!("Failed to render diagram, please check your Mermaid syntax: {err}")
    } else {
        format!("Error generating diagram: {err}")
    };
    let diagnostics = err.diagnostics();
    if !diagnostics.is_empty() {
        text.push_str("\nRenderer output:");
        for line in diagnostics {
            text.push('\n');
            text.push_str(line);
        }
    }
    tool_error(&text)
}

/// Whether a failure should carry the check-your-syntax hint.
fn is_syntax_failure(err: &RenderError) -> bool {
    if err.is_diagram_error() {
        return true;
    }
    let message = err.to_string().to_ascii_lowercase();
    SYNTAX_ERROR_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::testutil::MockRasterizer;

    fn ctx<'a>(settings: &'a Settings, rasterizer: &'a MockRasterizer) -> ToolContext<'a> {
        ToolContext {
            settings,
            rasterizer,
        }
    }

    fn call(ctx: &ToolContext<'_>, arguments: Value) -> Result<Value, InvalidArguments> {
        handle_generate(
            ctx,
            &serde_json::json!({ "name": "generate", "arguments": arguments }),
        )
    }

    fn inline_settings() -> Settings {
        Settings {
            output_mode: OutputMode::Inline,
        }
    }

    fn file_settings() -> Settings {
        Settings {
            output_mode: OutputMode::SaveToDisk,
        }
    }

    #[test]
    fn missing_code_is_rejected_before_rendering() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        let err = call(&ctx(&settings, &mock), serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("'code'"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn empty_code_is_rejected_before_rendering() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        let err = call(&ctx(&settings, &mock), serde_json::json!({ "code": "  \n" })).unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn unknown_theme_is_rejected_before_rendering() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        let err = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B", "theme": "solarized" }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("solarized"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn unsafe_background_is_rejected_before_rendering() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        let err = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B", "backgroundColor": "red\"; }" }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("backgroundColor"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn theme_and_background_reach_the_rasterizer() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        call(
            &ctx(&settings, &mock),
            serde_json::json!({
                "code": "graph TD; A-->B",
                "theme": "forest",
                "backgroundColor": "#F0F0F0"
            }),
        )
        .unwrap();
        let requests = mock.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].theme, Theme::Forest);
        assert_eq!(requests[0].background.as_deref(), Some("#F0F0F0"));
    }

    #[test]
    fn theme_defaults_when_absent() {
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B" }),
        )
        .unwrap();
        assert_eq!(mock.requests.borrow()[0].theme, Theme::Default);
    }

    #[test]
    fn inline_success_returns_image_and_text_blocks() {
        use base64::Engine;
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        let result = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B" }),
        )
        .unwrap();

        assert!(result.get("isError").is_none());
        let content = result["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["mimeType"], "image/png");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(content[0]["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, MockRasterizer::PNG_BYTES);
        assert!(content[1]["text"].as_str().unwrap().contains("420x180"));
    }

    #[test]
    fn inline_mode_writes_nothing_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let settings = inline_settings();
        let mock = MockRasterizer::ok();
        // name/folder are permitted but ignored in inline mode.
        call(
            &ctx(&settings, &mock),
            serde_json::json!({
                "code": "graph TD; A-->B",
                "name": "diagram1",
                "folder": dir.path().to_str().unwrap()
            }),
        )
        .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn file_mode_saves_png_and_answers_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let settings = file_settings();
        let mock = MockRasterizer::ok();
        let result = call(
            &ctx(&settings, &mock),
            serde_json::json!({
                "code": "graph TD; A-->B",
                "name": "diagram1",
                "folder": dir.path().to_str().unwrap()
            }),
        )
        .unwrap();

        let expected = dir.path().join("diagram1.png");
        assert!(result.get("isError").is_none());
        assert_eq!(
            result["content"][0]["text"].as_str().unwrap(),
            expected.display().to_string()
        );
        assert_eq!(std::fs::read(&expected).unwrap(), MockRasterizer::PNG_BYTES);
    }

    #[test]
    fn file_mode_requires_name_and_folder() {
        let settings = file_settings();
        let mock = MockRasterizer::ok();
        let err = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B" }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'name'"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn file_mode_rejects_traversing_names() {
        let dir = tempfile::tempdir().unwrap();
        let settings = file_settings();
        let mock = MockRasterizer::ok();
        for name in ["../evil", ".hidden", "a/b", ""] {
            let err = call(
                &ctx(&settings, &mock),
                serde_json::json!({
                    "code": "graph TD; A-->B",
                    "name": name,
                    "folder": dir.path().to_str().unwrap()
                }),
            )
            .unwrap_err();
            assert!(err.to_string().contains("'name'"), "accepted {name:?}");
        }
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn file_mode_rejects_missing_folder() {
        let settings = file_settings();
        let mock = MockRasterizer::ok();
        let err = call(
            &ctx(&settings, &mock),
            serde_json::json!({
                "code": "graph TD; A-->B",
                "name": "diagram1",
                "folder": "/mmdshot-no-such-dir"
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("existing directory"));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn diagram_failure_gets_syntax_hint_and_diagnostics() {
        let settings = inline_settings();
        let mock = MockRasterizer::failing(|| RenderError::Diagram {
            message: "Parse error on line 2".to_string(),
            diagnostics: vec!["mermaid: unresolved node reference".to_string()],
        });
        let result = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->" }),
        )
        .unwrap();

        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("check your Mermaid syntax"));
        assert!(text.contains("Parse error on line 2"));
        assert!(text.contains("unresolved node reference"));
    }

    #[test]
    fn sandbox_failure_gets_generic_prefix() {
        let settings = inline_settings();
        let mock = MockRasterizer::failing(|| RenderError::Sandbox {
            stage: "launch".to_string(),
            message: "no usable browser".to_string(),
        });
        let result = call(
            &ctx(&settings, &mock),
            serde_json::json!({ "code": "graph TD; A-->B" }),
        )
        .unwrap();

        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error generating diagram:"));
        assert!(text.contains("no usable browser"));
        assert!(!text.contains("Mermaid syntax"));
    }

    #[test]
    fn write_png_atomic_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        write_png_atomic(b"bytes", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
