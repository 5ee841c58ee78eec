//! CLI module for Plotdo
//!
//! Every screen operation is also available from the command line. Without a
//! subcommand the GUI starts instead.

mod commands;
mod output;
mod shell;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::backend::{self, Backend};
use crate::config::Config;

pub use output::OutputFormat;

/// Plotdo - sine plots, to-dos and messages against a small web backend
#[derive(Parser, Debug)]
#[command(name = "plotdo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    /// Backend selection
    #[command(flatten)]
    pub backend: BackendOptions,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Overrides for the configured backend
#[derive(Parser, Debug, Clone, Default)]
pub struct BackendOptions {
    /// Use the in-process simulated backend
    #[arg(long, global = true)]
    pub mock: bool,

    /// Backend base URL (e.g., "http://127.0.0.1:5000")
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

impl BackendOptions {
    /// A copy of `config` with the overrides applied, leaving `config` as loaded
    pub fn session_config(&self, config: &Config) -> Config {
        let mut session = config.clone();
        self.apply(&mut session);
        session
    }

    /// Apply the overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if self.mock {
            config.backend.mock = true;
        }
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sine plot generation
    Plot {
        #[command(subcommand)]
        command: commands::plot::PlotCommands,
    },

    /// To-do list management
    Todo {
        #[command(subcommand)]
        command: commands::todo::TodoCommands,
    },

    /// Backend status and message echo
    Message {
        #[command(subcommand)]
        command: commands::message::MessageCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },

    /// Interactive shell
    Shell,
}

/// Everything a command handler needs
pub struct CommandContext {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(config: Config, format: OutputFormat, quiet: bool) -> Result<Self> {
        let backend = backend::connect(&config)?;
        Ok(Self {
            config,
            backend,
            format,
            quiet,
        })
    }

    /// Same backend and config, different output flags
    fn with_output(&self, format: OutputFormat, quiet: bool) -> Self {
        Self {
            config: self.config.clone(),
            backend: self.backend.clone(),
            format,
            quiet,
        }
    }
}

/// Load the config file and apply command-line overrides
pub fn resolve_config(options: &BackendOptions) -> Result<Config> {
    let config = Config::load()?;
    Ok(options.session_config(&config))
}

/// Dispatch a parsed command
async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Plot { command } => commands::plot::run(command, ctx).await,
        Commands::Todo { command } => commands::todo::run(command, ctx).await,
        Commands::Message { command } => commands::message::run(command, ctx).await,
        Commands::Config { command } => commands::config::run(command, ctx.format, ctx.quiet).await,
        Commands::Shell => shell::run(ctx).await,
    }
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli, command: Commands) -> Result<()> {
    let config = resolve_config(&cli.backend)?;
    let ctx = CommandContext::new(config, cli.output.format(), cli.output.quiet)?;
    dispatch(command, &ctx).await
}
