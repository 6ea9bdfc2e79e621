//! Transient HTML shell documents for the rendering session.
//!
//! Each render writes a minimal page containing an empty container div to a
//! temp file the browser session can navigate to. The file is deleted when
//! the guard drops, on success and failure alike.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Id of the element the Mermaid SVG is rendered into.
pub const CONTAINER_ID: &str = "container";

/// A transient HTML document on disk, deleted on drop.
#[derive(Debug)]
pub struct HtmlShell {
    file: NamedTempFile,
}

impl HtmlShell {
    /// Write a shell document with an optional CSS page background.
    pub fn create(background: Option<&str>) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("mmdshot-")
            .suffix(".html")
            .tempfile()?;
        file.write_all(shell_document(background).as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Path the browser session navigates to.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Build the shell markup. The background value is validated by the protocol
/// layer; stripping here is a second line of defense for direct library use.
fn shell_document(background: Option<&str>) -> String {
    let body_style = match background {
        Some(color) => format!("margin:0;padding:0;background:{}", strip_attr(color)),
        None => "margin:0;padding:0".to_string(),
    };
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"></head>\
         <body style=\"{body_style}\"><div id=\"{CONTAINER_ID}\"></div></body></html>"
    )
}

/// Remove characters that could break out of the style attribute.
fn strip_attr(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '<' | '>' | ';'))
        .collect()
}
