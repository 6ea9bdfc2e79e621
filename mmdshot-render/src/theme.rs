//! Mermaid theme selection.

use std::fmt;
use std::str::FromStr;

/// The fixed set of Mermaid themes the `generate` tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
}

impl Theme {
    /// Accepted wire names, in schema order.
    pub const NAMES: [&'static str; 4] = ["default", "forest", "dark", "neutral"];

    /// The wire name passed to `mermaid.initialize`.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Forest => "forest",
            Theme::Dark => "dark",
            Theme::Neutral => "neutral",
        }
    }
}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Theme::Default),
            "forest" => Ok(Theme::Forest),
            "dark" => Ok(Theme::Dark),
            "neutral" => Ok(Theme::Neutral),
            _ => Err(UnknownTheme(s.to_string())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A theme name outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown theme {:?} (expected one of: {})",
            self.0,
            Theme::NAMES.join(", ")
        )
    }
}

impl std::error::Error for UnknownTheme {}
