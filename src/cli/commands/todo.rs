//! To-do list commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::backend::TodoItem;
use crate::cli::CommandContext;
use crate::cli::output::{print_formatted, print_success};
use crate::lifecycle::RequestState;
use crate::retry::RetryPolicy;
use crate::state::TodosState;

#[derive(Subcommand, Debug)]
pub enum TodoCommands {
    /// List all to-do items, newest first
    List,

    /// Add a to-do item and show the refreshed list
    Add {
        /// Item text (multiple words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(Serialize)]
struct TodoList<'a> {
    count: usize,
    items: &'a [TodoItem],
}

pub async fn run(command: TodoCommands, ctx: &CommandContext) -> Result<()> {
    let mut todos = TodosState::new(ctx.backend.clone(), todo_retry(ctx));

    match command {
        TodoCommands::List => list(&mut todos, ctx).await,
        TodoCommands::Add { text } => add(&mut todos, &text.join(" "), ctx).await,
    }
}

fn todo_retry(ctx: &CommandContext) -> RetryPolicy {
    if ctx.config.retry.apply_to_todos {
        RetryPolicy::from_config(&ctx.config.retry)
    } else {
        RetryPolicy::single_attempt()
    }
}

async fn list(todos: &mut TodosState, ctx: &CommandContext) -> Result<()> {
    if let RequestState::Failed(msg) = todos.refresh().await? {
        anyhow::bail!("{}", msg);
    }
    print_list(todos.items(), ctx);
    Ok(())
}

async fn add(todos: &mut TodosState, text: &str, ctx: &CommandContext) -> Result<()> {
    if let RequestState::Failed(msg) = todos.add(text).await? {
        anyhow::bail!("{}", msg);
    }
    // The insert went through; a failed re-fetch is reported but the item exists
    if let Some(msg) = todos.list.state().error() {
        anyhow::bail!("Added, but could not refresh the list: {}", msg);
    }

    print_success(&format!("Added: {}", text.trim()), ctx.format, ctx.quiet);
    print_list(todos.items(), ctx);
    Ok(())
}

fn print_list(items: &[TodoItem], ctx: &CommandContext) {
    let list = TodoList {
        count: items.len(),
        items,
    };

    print_formatted(&list, ctx.format, |l| {
        if l.items.is_empty() {
            return "No to-do items".to_string();
        }
        l.items
            .iter()
            .map(|item| match item.created() {
                Some(created) => format!(
                    "{:>5}  {}  ({})",
                    item.id.to_string(),
                    item.text,
                    created.format("%Y-%m-%d %H:%M")
                ),
                None => format!("{:>5}  {}", item.id.to_string(), item.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    });
}
