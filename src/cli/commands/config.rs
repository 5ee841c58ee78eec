//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{print_formatted, print_success, OutputFormat};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a specific config value
    Get {
        /// Config key (e.g., "backend.base_url", "retry.max_attempts")
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., "backend.base_url", "retry.max_attempts")
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ConfigPathResult {
    path: String,
    exists: bool,
}

#[derive(Serialize)]
struct ConfigValue<'a> {
    key: &'a str,
    value: String,
}

pub async fn run(command: ConfigCommands, format: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(format).await,
        ConfigCommands::Get { key } => get(&key, format).await,
        ConfigCommands::Set { key, value } => set(&key, &value, format, quiet).await,
        ConfigCommands::Path => path(format).await,
    }
}

/// Shows the file's contents, not the per-invocation `--mock`/`--base-url` overrides
async fn show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
    }

    Ok(())
}

async fn get(key: &str, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let value = ConfigValue {
        key,
        value: config.get_value(key)?,
    };

    print_formatted(&value, format, |v| v.value.clone());
    Ok(())
}

async fn set(key: &str, value: &str, format: OutputFormat, quiet: bool) -> Result<()> {
    let mut config = Config::load()?;

    config.set_value(key, value)?;
    config.save()?;

    let stored = ConfigValue {
        key,
        value: config.get_value(key)?,
    };
    if format == OutputFormat::Json {
        print_formatted(&stored, format, |_| String::new());
    } else {
        print_success(&format!("Set {} = {}", stored.key, stored.value), format, quiet);
    }
    Ok(())
}

async fn path(format: OutputFormat) -> Result<()> {
    let path = Config::config_path()?;
    let exists = path.exists();

    let result = ConfigPathResult {
        path: path.to_string_lossy().to_string(),
        exists,
    };

    print_formatted(&result, format, |r| {
        format!("{}{}", r.path, if r.exists { "" } else { " (not found)" })
    });

    Ok(())
}
