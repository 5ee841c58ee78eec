//! Plot generation commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::cli::output::{format_size, print_formatted, print_success};
use crate::lifecycle::RequestState;
use crate::retry::RetryPolicy;
use crate::state::PlotState;

#[derive(Subcommand, Debug)]
pub enum PlotCommands {
    /// Generate a sine plot for an amplitude
    Generate {
        /// Peak amplitude, must be positive (default: plot.default_amplitude)
        #[arg(short, long, allow_negative_numbers = true)]
        amplitude: Option<f64>,

        /// Write the PNG to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the written file in the default image viewer
        #[arg(long, requires = "output")]
        open: bool,
    },
}

#[derive(Serialize)]
struct PlotResult {
    amplitude: f64,
    png_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
}

pub async fn run(command: PlotCommands, ctx: &CommandContext) -> Result<()> {
    match command {
        PlotCommands::Generate {
            amplitude,
            output,
            open,
        } => generate(ctx, amplitude, output, open).await,
    }
}

async fn generate(
    ctx: &CommandContext,
    amplitude: Option<f64>,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let amplitude = amplitude.unwrap_or(ctx.config.plot.default_amplitude);
    let retry = RetryPolicy::from_config(&ctx.config.retry);
    let mut plot = PlotState::new(ctx.backend.clone(), retry, amplitude);

    let image = match plot.submit(amplitude).await? {
        RequestState::Succeeded(image) => image.clone(),
        RequestState::Failed(msg) => anyhow::bail!("{}", msg),
        state => anyhow::bail!("Plot request ended {}", state.label()),
    };

    let bytes = image.decode_png()?;

    if let Some(path) = &output {
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote plot to {:?}", path);
    }

    let result = PlotResult {
        amplitude,
        png_bytes: bytes.len() as u64,
        output: output.as_ref().map(|p| p.to_string_lossy().to_string()),
        image_base64: output.is_none().then(|| image.as_base64().to_string()),
    };

    print_formatted(&result, ctx.format, |r| {
        let mut lines = vec![format!(
            "Generated plot for amplitude {} ({} PNG)",
            r.amplitude,
            format_size(r.png_bytes)
        )];
        match &r.output {
            Some(path) => lines.push(format!("Saved to {}", path)),
            None => lines.push("Use --output <file> to save the image".to_string()),
        }
        lines.join("\n")
    });

    if open {
        if let Some(path) = &output {
            open::that(path).with_context(|| format!("Failed to open {}", path.display()))?;
            print_success("Opened plot in image viewer", ctx.format, ctx.quiet);
        }
    }

    Ok(())
}
