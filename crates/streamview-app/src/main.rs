use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

fn main() -> ExitCode {
    // RUST_LOG=debug for more detail, GST_DEBUG=3 for GStreamer's own log
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let cli = cli::Cli::parse();
    info!("streamview v{}", env!("CARGO_PKG_VERSION"));

    match app::run(cli) {
        Ok(stats) => {
            info!("streamview exited cleanly ({} ticks).", stats.heartbeat);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
