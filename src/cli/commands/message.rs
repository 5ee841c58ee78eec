//! Backend status and echo commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::cli::output::print_formatted;
use crate::lifecycle::RequestState;
use crate::retry::RetryPolicy;
use crate::state::MessageState;

#[derive(Subcommand, Debug)]
pub enum MessageCommands {
    /// Fetch the backend status message
    Status,

    /// Send a message and print the backend's echo
    Echo {
        /// Message text (multiple words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(Serialize)]
struct StatusResult<'a> {
    backend: &'a str,
    message: &'a str,
}

pub async fn run(command: MessageCommands, ctx: &CommandContext) -> Result<()> {
    let retry = RetryPolicy::from_config(&ctx.config.retry);
    let mut messages = MessageState::new(ctx.backend.clone(), retry);

    match command {
        MessageCommands::Status => status(&mut messages, ctx).await,
        MessageCommands::Echo { text } => echo(&mut messages, &text.join(" "), ctx).await,
    }
}

async fn status(messages: &mut MessageState, ctx: &CommandContext) -> Result<()> {
    let message = match messages.check_status().await? {
        RequestState::Succeeded(message) => message,
        RequestState::Failed(msg) => anyhow::bail!("{}", msg),
        state => anyhow::bail!("Status check ended {}", state.label()),
    };

    let backend = if ctx.config.backend.mock {
        "mock"
    } else {
        ctx.config.backend.base_url.as_str()
    };
    let result = StatusResult { backend, message };

    print_formatted(&result, ctx.format, |r| format!("[OK] {} says: {}", r.backend, r.message));
    Ok(())
}

async fn echo(messages: &mut MessageState, text: &str, ctx: &CommandContext) -> Result<()> {
    let reply = match messages.send_echo(text).await? {
        RequestState::Succeeded(reply) => reply,
        RequestState::Failed(msg) => anyhow::bail!("{}", msg),
        state => anyhow::bail!("Echo ended {}", state.label()),
    };

    print_formatted(reply, ctx.format, |r| r.message.clone());
    Ok(())
}
