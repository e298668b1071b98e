//! CLI entry point for the olyshare tool.

use anyhow::Result;
use tracing::debug;

mod app;
mod app_config;
mod cli;

use app::config_runtime::{apply_config_defaults, parse_cli_with_sources};
use app::terminal;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let (args, cli_sources) = parse_cli_with_sources();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let no_color = terminal::should_disable_color(
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(
        terminal::default_log_level(args.quiet, args.verbose),
        no_color,
    );

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    if loaded.config.is_some()
        && let Some(path) = &loaded.path
    {
        debug!(path = %path.display(), "Loaded config file");
    }
    let args = apply_config_defaults(args, &cli_sources, loaded.config.as_ref())?;
    debug!(?args, "CLI arguments resolved");

    app::runtime::run_import(&args).await
}
