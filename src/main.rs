//! mmdshot: an MCP stdio server that renders Mermaid diagrams to PNG.
//!
//! Protocol traffic owns stdout; logging goes to stderr so operators can
//! raise verbosity without corrupting the transport.

use anyhow::Context;
use clap::Parser;
use mmdshot_mcp::settings::Settings;
use mmdshot_render::BrowserRasterizer;

/// mmdshot - render Mermaid diagrams to PNG over MCP
#[derive(Parser)]
#[command(name = "mmdshot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level (overrides RUST_LOG)
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevelArg>,
}

/// Log level argument for the CLI.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`.
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.log_level {
        builder.filter_level(level.to_level_filter());
    }
    builder.format_timestamp(None).init();

    let settings = Settings::from_env();
    let rasterizer = BrowserRasterizer::from_env();

    // A broken stdio transport is the only fatal condition; per-request
    // failures are recovered into protocol responses inside the loop.
    mmdshot_mcp::run_mcp_server(&settings, &rasterizer).context("stdio transport failed")
}
