//! Headless-browser rendering adapter for mmdshot.
//!
//! Turns a Mermaid diagram source string into a PNG raster cropped to the
//! rendered element, by driving the Mermaid library inside a Puppeteer
//! headless-browser session reached through a short-lived Node helper
//! process. One call owns one session; the session and every transient file
//! are torn down on all exit paths.
//!
//! The protocol layer talks to this crate exclusively through the
//! [`Rasterizer`] trait, so tests can substitute a scripted implementation
//! and never touch a browser.
//!
//! # Module layout
//!
//! - [`theme`] — the fixed Mermaid theme enumeration
//! - [`shell`] — transient HTML shell construction and delete-on-drop cleanup
//! - [`browser`] — Node/Puppeteer helper driving and outcome decoding

pub mod browser;
pub mod shell;
pub mod theme;

mod script;

pub use browser::{BrowserOptions, BrowserRasterizer};
pub use theme::Theme;

use std::io;
use thiserror::Error;

/// A validated request to render one diagram.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Diagram source text in Mermaid's markup dialect.
    pub source: String,
    /// Theme the Mermaid library is initialized with.
    pub theme: Theme,
    /// Optional CSS background color for the page behind the diagram.
    pub background: Option<String>,
}

/// A successful render: PNG bytes cropped to the diagram element.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
    /// Bounding-box width of the rendered element, in CSS pixels.
    pub width: u32,
    /// Bounding-box height of the rendered element, in CSS pixels.
    pub height: u32,
}

/// Why a render attempt produced no raster.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The Mermaid library rejected the diagram source. Carries any console
    /// lines captured from the page during the attempt.
    #[error("{message}")]
    Diagram {
        message: String,
        diagnostics: Vec<String>,
    },

    /// The browser sandbox failed around the render call: launch, page
    /// setup, script injection, or screenshot capture.
    #[error("browser session failed during {stage}: {message}")]
    Sandbox { stage: String, message: String },

    /// The Node helper process could not be spawned or did not produce a
    /// decodable outcome document.
    #[error("renderer helper failed: {0}")]
    Helper(String),

    /// The transient HTML shell could not be written.
    #[error("failed to write HTML shell: {0}")]
    Shell(#[from] io::Error),
}

impl RenderError {
    /// Whether this failure originates in the diagram source itself rather
    /// than in rendering infrastructure.
    pub fn is_diagram_error(&self) -> bool {
        matches!(self, RenderError::Diagram { .. })
    }

    /// Console lines captured from the rendering session, if any.
    pub fn diagnostics(&self) -> &[String] {
        match self {
            RenderError::Diagram { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// The seam between the protocol layer and the rendering sandbox.
///
/// One call renders one diagram in one scoped session; implementations must
/// release the session and delete transient files on every exit path.
pub trait Rasterizer {
    fn rasterize(&self, request: &RenderRequest) -> Result<Raster, RenderError>;
}
