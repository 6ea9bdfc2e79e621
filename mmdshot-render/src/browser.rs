//! Node/Puppeteer helper driving.
//!
//! One [`BrowserRasterizer::rasterize`] call spawns one short-lived Node
//! process that owns one headless-browser session. The request travels as
//! JSON on the helper's stdin; the outcome comes back as one JSON document
//! on its stdout. Helper stderr is inherited, so sandbox diagnostics land on
//! the server's operator stream.

use crate::script::RENDER_SCRIPT;
use crate::shell::HtmlShell;
use crate::{Raster, Rasterizer, RenderError, RenderRequest};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// Environment configuration
// ---------------------------------------------------------------------------

/// Environment variable naming the browser executable Puppeteer should use.
pub const BROWSER_EXE_ENV: &str = "MMDSHOT_BROWSER_EXE";
/// Environment variable that disables the Chromium sandbox (container use).
pub const NO_SANDBOX_ENV: &str = "MMDSHOT_NO_SANDBOX";
/// Environment variable pointing at a Mermaid IIFE bundle on disk.
pub const MERMAID_JS_ENV: &str = "MMDSHOT_MERMAID_JS";
/// Environment variable for the helper's working directory, the place whose
/// `node_modules` must provide `puppeteer` and (unless overridden) `mermaid`.
pub const NODE_CWD_ENV: &str = "MMDSHOT_NODE_CWD";
/// Environment variable overriding the Node executable.
pub const NODE_PROGRAM_ENV: &str = "MMDSHOT_NODE_PROGRAM";

/// Once-at-startup knobs for the helper session.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Node executable used to run the helper.
    pub node_program: String,
    /// Working directory for the helper; defaults to the server's.
    pub node_cwd: Option<PathBuf>,
    /// Explicit browser executable; Puppeteer picks its own when unset.
    pub browser_exe: Option<PathBuf>,
    /// Launch Chromium without its sandbox (required in most containers).
    pub no_sandbox: bool,
    /// Explicit Mermaid bundle path; resolved by the helper when unset.
    pub mermaid_js: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_program: "node".to_string(),
            node_cwd: None,
            browser_exe: None,
            no_sandbox: false,
            mermaid_js: None,
        }
    }
}

impl BrowserOptions {
    /// Read every knob from the process environment.
    pub fn from_env() -> Self {
        Self {
            node_program: env_nonempty(NODE_PROGRAM_ENV).unwrap_or_else(|| "node".to_string()),
            node_cwd: env_nonempty(NODE_CWD_ENV).map(PathBuf::from),
            browser_exe: env_nonempty(BROWSER_EXE_ENV).map(PathBuf::from),
            no_sandbox: env_flag(NO_SANDBOX_ENV),
            mermaid_js: env_nonempty(MERMAID_JS_ENV).map(PathBuf::from),
        }
    }
}

fn env_nonempty(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_flag(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Helper wire documents
// ---------------------------------------------------------------------------

/// Request document written to the helper's stdin.
#[derive(Debug, Serialize)]
struct HelperRequest<'a> {
    html_path: String,
    source: &'a str,
    theme: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    browser_exe: Option<String>,
    no_sandbox: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mermaid_js: Option<String>,
}

/// Outcome document read from the helper's stdout.
#[derive(Debug, Deserialize)]
struct HelperOutcome {
    ok: bool,
    #[serde(default)]
    png_base64: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

/// Production rasterizer: one Node/Puppeteer session per request.
#[derive(Debug, Clone, Default)]
pub struct BrowserRasterizer {
    options: BrowserOptions,
}

impl BrowserRasterizer {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    /// Convenience constructor reading every knob from the environment.
    pub fn from_env() -> Self {
        Self::new(BrowserOptions::from_env())
    }

    fn run_helper(
        &self,
        shell: &HtmlShell,
        request: &RenderRequest,
    ) -> Result<HelperOutcome, RenderError> {
        let payload = serde_json::to_vec(&HelperRequest {
            html_path: shell.path().display().to_string(),
            source: &request.source,
            theme: request.theme.as_str(),
            browser_exe: self
                .options
                .browser_exe
                .as_ref()
                .map(|p| p.display().to_string()),
            no_sandbox: self.options.no_sandbox,
            mermaid_js: self
                .options
                .mermaid_js
                .as_ref()
                .map(|p| p.display().to_string()),
        })
        .map_err(|e| RenderError::Helper(format!("failed to encode helper request: {e}")))?;

        let mut cmd = Command::new(&self.options.node_program);
        cmd.arg("-e")
            .arg(RENDER_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &self.options.node_cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            RenderError::Helper(format!("failed to spawn {}: {e}", self.options.node_program))
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .map_err(|e| RenderError::Helper(format!("failed to write helper request: {e}")))?;
            // Dropping stdin closes the pipe so the helper sees EOF.
        }

        let output = child
            .wait_with_output()
            .map_err(|e| RenderError::Helper(format!("failed to wait for helper: {e}")))?;
        if output.stdout.is_empty() {
            return Err(RenderError::Helper(format!(
                "helper produced no outcome (exit status: {})",
                output.status
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| RenderError::Helper(format!("failed to decode helper outcome: {e}")))
    }
}

impl Rasterizer for BrowserRasterizer {
    fn rasterize(&self, request: &RenderRequest) -> Result<Raster, RenderError> {
        let shell = HtmlShell::create(request.background.as_deref())?;
        log::debug!(
            "rendering {} byte source (theme {}) via {}",
            request.source.len(),
            request.theme,
            self.options.node_program
        );
        let outcome = self.run_helper(&shell, request)?;
        decode_outcome(outcome)
    }
}

/// Map a helper outcome document onto the adapter's result types.
fn decode_outcome(outcome: HelperOutcome) -> Result<Raster, RenderError> {
    if outcome.ok {
        let data = outcome
            .png_base64
            .filter(|d| !d.is_empty())
            .ok_or_else(|| RenderError::Helper("helper outcome missing image data".to_string()))?;
        use base64::Engine;
        let png = base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| {
                RenderError::Helper(format!("helper image data is not valid base64: {e}"))
            })?;
        let (width, height) = match (outcome.width, outcome.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(RenderError::Helper(
                    "helper outcome missing raster dimensions".to_string(),
                ));
            }
        };
        return Ok(Raster { png, width, height });
    }

    let message = outcome
        .error
        .unwrap_or_else(|| "render failed with no error message".to_string());
    match outcome.stage.as_deref() {
        Some("render") => Err(RenderError::Diagram {
            message,
            diagnostics: outcome.logs,
        }),
        stage => Err(RenderError::Sandbox {
            stage: stage.unwrap_or("unknown").to_string(),
            message,
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
