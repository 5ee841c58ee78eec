// Hide console window in release builds (Windows GUI app)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod backend;
mod cli;
mod config;
mod lifecycle;
mod retry;
mod state;
mod task;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr so `--json` output on stdout stays parseable.
///
/// The GUI logs debug output for this crate by default; CLI commands only
/// warn unless `--verbose` is given. `RUST_LOG` overrides both.
fn init_logging(cli_mode: bool, verbose: bool) {
    let default_filter = match (cli_mode, verbose) {
        (false, _) | (true, true) => "plotdo=debug,info",
        (true, false) => "plotdo=warn,warn",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = cli::Cli::parse();
    init_logging(cli.command.is_some(), cli.output.verbose);

    if let Some(command) = cli.command.take() {
        return cli::run(cli, command).await;
    }

    tracing::info!("Starting Plotdo");

    // Overrides pick the backend but never reach the file the Settings tab saves
    let config = config::Config::load_or_default();
    let session = cli.backend.session_config(&config);
    let backend = backend::connect(&session)?;

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([760.0, 680.0])
        .with_min_inner_size([520.0, 420.0])
        .with_title("Plotdo");

    let native_options = eframe::NativeOptions {
        viewport,
        persist_window: true, // Save/restore window size and position
        ..Default::default()
    };

    eframe::run_native(
        "Plotdo",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::PlotdoApp::new(cc, config, backend)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    Ok(())
}
