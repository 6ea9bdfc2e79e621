//! Process-wide deployment settings.
//!
//! Read once at startup from the environment. The output mode decides
//! whether `generate` answers with inline image bytes or persists a PNG
//! under a caller-supplied folder and returns its path.

use std::fmt;

/// Environment variable selecting the output mode. Unset means inline.
pub const INLINE_IMAGES_ENV: &str = "MMDSHOT_INLINE_IMAGES";

/// How rendered rasters are returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Return PNG bytes inline as an MCP image content block.
    #[default]
    Inline,
    /// Persist the PNG under a caller-supplied folder and return the path.
    SaveToDisk,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::Inline => "inline",
            OutputMode::SaveToDisk => "save-to-disk",
        })
    }
}

/// Deployment configuration, fixed for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub output_mode: OutputMode,
}

impl Settings {
    /// Read settings from the environment.
    pub fn from_env() -> Self {
        Self {
            output_mode: output_mode_from_env(),
        }
    }

    /// Whether callers must supply `name` and `folder`.
    pub fn saves_to_disk(&self) -> bool {
        self.output_mode == OutputMode::SaveToDisk
    }
}

fn output_mode_from_env() -> OutputMode {
    match std::env::var(INLINE_IMAGES_ENV) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "no" | "off" => OutputMode::SaveToDisk,
            _ => OutputMode::Inline,
        },
        Err(_) => OutputMode::Inline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_env_override_and_default() {
        // SAFETY: `std::env::set_var` / `remove_var` are `unsafe` in Rust 2024
        // because they are not thread-safe. Acceptable here because this
        // variable is unique to this test, unset again before it returns, and
        // only touched from `#[cfg(test)]` code.
        unsafe {
            std::env::set_var(INLINE_IMAGES_ENV, "false");
        }
        assert_eq!(Settings::from_env().output_mode, OutputMode::SaveToDisk);
        assert!(Settings::from_env().saves_to_disk());

        // SAFETY: see set_var comment above.
        unsafe {
            std::env::set_var(INLINE_IMAGES_ENV, "1");
        }
        assert_eq!(Settings::from_env().output_mode, OutputMode::Inline);

        // SAFETY: see set_var comment above.
        unsafe {
            std::env::remove_var(INLINE_IMAGES_ENV);
        }
        assert_eq!(Settings::from_env().output_mode, OutputMode::Inline);
        assert!(!Settings::from_env().saves_to_disk());
    }
}
