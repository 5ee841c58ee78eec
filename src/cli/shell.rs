//! Interactive shell mode
//!
//! A REPL with command history, tab completion and inline hints. The command
//! tree comes from the clap definitions, so every subcommand and flag the CLI
//! accepts can be completed. One backend connection is shared by every command
//! in the session.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};

use super::commands;
use super::{Cli, CommandContext, Commands};

const PROMPT: &str = "plotdo> ";

/// Words the shell handles itself
const BUILTINS: [&str; 3] = ["help", "exit", "quit"];

/// A flag as it can be typed on a shell line
#[derive(Debug)]
struct Flag {
    long: Option<String>,
    short: Option<char>,
    takes_value: bool,
}

impl Flag {
    fn matches(&self, word: &str) -> bool {
        match word.strip_prefix("--") {
            Some(long) => self.long.as_deref() == Some(long),
            None => {
                let mut chars = word.chars().skip(1);
                matches!((chars.next(), chars.next()), (Some(c), None) if Some(c) == self.short)
            }
        }
    }
}

/// One level of the command tree
#[derive(Debug)]
struct CommandNode {
    name: String,
    flags: Vec<Flag>,
    children: Vec<CommandNode>,
}

impl CommandNode {
    fn from_clap(command: &clap::Command) -> Self {
        let flags = command
            .get_arguments()
            .filter(|arg| !arg.is_positional() && !arg.is_hide_set())
            .map(|arg| Flag {
                long: arg.get_long().map(str::to_string),
                short: arg.get_short(),
                takes_value: arg.get_action().takes_values(),
            })
            .collect();

        Self {
            name: command.get_name().to_string(),
            flags,
            children: shell_subcommands(command).map(Self::from_clap).collect(),
        }
    }

    fn leaf(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Subcommands that make sense inside the shell
fn shell_subcommands(command: &clap::Command) -> impl Iterator<Item = &clap::Command> {
    command
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "shell")
}

/// Completion, hints and hint dimming for the shell prompt
struct ShellHelper {
    root: CommandNode,
}

impl ShellHelper {
    fn new() -> Self {
        let mut root = CommandNode::from_clap(&Cli::command());
        root.children.extend(BUILTINS.iter().copied().map(CommandNode::leaf));
        Self { root }
    }

    /// Follow the completed words down the tree.
    ///
    /// Returns the nodes passed through (root first) and whether the next
    /// word is the value of a flag. `None` means an unknown command.
    fn walk(&self, words: &[&str]) -> Option<(Vec<&CommandNode>, bool)> {
        let mut path = vec![&self.root];
        let mut expects_value = false;

        for word in words {
            if expects_value {
                expects_value = false;
                continue;
            }
            if word.starts_with('-') {
                expects_value = !word.contains('=')
                    && path
                        .iter()
                        .flat_map(|node| &node.flags)
                        .any(|flag| flag.takes_value && flag.matches(word));
                continue;
            }

            let current = path.last().copied()?;
            match current.children.iter().find(|child| child.name == *word) {
                Some(child) => path.push(child),
                // Positional arguments of a leaf command
                None if current.children.is_empty() && path.len() > 1 => {}
                None => return None,
            }
        }

        Some((path, expects_value))
    }

    /// Completion candidates for the word under the cursor at the end of `line`
    fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        let start = line
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let (done, partial) = line.split_at(start);
        let words: Vec<&str> = done.split_whitespace().collect();

        let Some((path, expects_value)) = self.walk(&words) else {
            return (start, Vec::new());
        };
        if expects_value {
            return (start, Vec::new());
        }

        let pool: Vec<String> = if partial.starts_with('-') {
            path.iter()
                .flat_map(|node| &node.flags)
                .filter_map(|flag| flag.long.as_ref())
                .map(|long| format!("--{}", long))
                .collect()
        } else {
            let current = path.last().copied().unwrap_or(&self.root);
            current.children.iter().map(|child| child.name.clone()).collect()
        };

        let mut matches: Vec<String> = pool
            .into_iter()
            .filter(|candidate| candidate.starts_with(partial))
            .collect();
        matches.dedup();
        (start, matches)
    }

    /// The rest of the word being typed, when exactly one candidate fits
    fn hint_for(&self, line: &str) -> Option<String> {
        if line.is_empty() || line.ends_with(char::is_whitespace) {
            return None;
        }
        let (start, matches) = self.candidates(line);
        match matches.as_slice() {
            [only] => {
                let typed = line.len() - start;
                (only.len() > typed).then(|| only[typed..].to_string())
            }
            _ => None,
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        // Only hint with the cursor at the end of the line
        if pos < line.len() {
            return None;
        }
        self.hint_for(line)
    }
}

impl Highlighter for ShellHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{}\x1b[0m", hint))
    }
}

impl Validator for ShellHelper {}
impl Helper for ShellHelper {}

/// Split a shell line into arguments.
///
/// Single or double quotes group words and may be empty: `todo add ""`
/// yields an empty third argument.
fn parse_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut word: Option<String> = None;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => word.get_or_insert_with(String::new).push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                word.get_or_insert_with(String::new);
            }
            None if c.is_whitespace() => args.extend(word.take()),
            None => word.get_or_insert_with(String::new).push(c),
        }
    }

    args.extend(word);
    args
}

/// Run a single command in the shell.
/// Returns Ok(true) to continue, Ok(false) to exit gracefully.
async fn run_command(args: Vec<String>, session: &CommandContext) -> Result<bool> {
    match args.first().map(String::as_str) {
        None => return Ok(true),
        Some("help") => {
            print!("{}", help_text());
            return Ok(true);
        }
        Some("exit" | "quit") => return Ok(false),
        Some(_) => {}
    }

    let argv = std::iter::once("plotdo".to_string()).chain(args);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => {
            // clap's message carries the usage hint
            println!("{}", e);
            return Ok(true);
        }
    };

    let command = match cli.command {
        Some(Commands::Shell) => {
            println!("Already in shell mode.");
            return Ok(true);
        }
        Some(command) => command,
        None => {
            print!("{}", help_text());
            return Ok(true);
        }
    };

    let format = cli.output.format();
    let quiet = cli.output.quiet;

    // Backend overrides on a single line get their own connection
    let ctx = if cli.backend.mock || cli.backend.base_url.is_some() {
        CommandContext::new(cli.backend.session_config(&session.config), format, quiet)?
    } else {
        session.with_output(format, quiet)
    };

    match command {
        Commands::Plot { command } => commands::plot::run(command, &ctx).await?,
        Commands::Todo { command } => commands::todo::run(command, &ctx).await?,
        Commands::Message { command } => commands::message::run(command, &ctx).await?,
        Commands::Config { command } => commands::config::run(command, format, quiet).await?,
        Commands::Shell => {}
    }
    Ok(true)
}

/// Command summary built from the clap definitions
fn help_text() -> String {
    let cli = Cli::command();
    let mut text = String::from("Commands:\n");

    for group in shell_subcommands(&cli) {
        for command in shell_subcommands(group) {
            let usage = format!("{} {}", group.get_name(), command.get_name());
            let about = command.get_about().map(|a| a.to_string()).unwrap_or_default();
            text.push_str(&format!("  {:<24} {}\n", usage, about));
        }
    }

    text.push_str("  help                     Show this help\n");
    text.push_str("  exit, quit               Exit\n\n");
    text.push_str("Add --help to any command for its options. --json, --quiet, --mock and\n");
    text.push_str("--base-url <url> apply to a single line.\n");
    text
}

/// Get the history file path
fn history_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "plotdo", "Plotdo")
        .map(|dirs| dirs.data_dir().join("shell_history"))
}

fn build_editor() -> Result<Editor<ShellHelper, DefaultHistory>> {
    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(ShellHelper::new()));
    Ok(editor)
}

fn save_history(editor: &mut Editor<ShellHelper, DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    if let Err(e) = editor.save_history(path) {
        tracing::warn!("Could not save shell history: {}", e);
    }
}

/// Run the interactive shell
pub async fn run(session: &CommandContext) -> Result<()> {
    println!("Plotdo Interactive Shell v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands, 'exit' to quit.\n");

    let mut editor = build_editor()?;
    let history = history_path();
    if let Some(path) = &history {
        // Missing on first run
        if let Err(e) = editor.load_history(path) {
            tracing::debug!("No shell history loaded: {}", e);
        }
    }

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(e) => {
                tracing::error!("Shell input failed: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        match run_command(parse_args(line), session).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    if let Some(path) = &history {
        save_history(&mut editor, path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::cli::OutputFormat;
    use std::sync::Arc;

    fn mock_session(mock: Arc<MockBackend>) -> CommandContext {
        CommandContext {
            config: crate::config::Config::default(),
            backend: mock,
            format: OutputFormat::Text,
            quiet: true,
        }
    }

    #[test]
    fn test_parse_args_keeps_quoted_text() {
        let args = parse_args("todo add \"buy milk\" --json");
        assert_eq!(args, vec!["todo", "add", "buy milk", "--json"]);

        let args = parse_args("message echo 'it''s'  x");
        assert_eq!(args, vec!["message", "echo", "its", "x"]);
    }

    #[test]
    fn test_parse_args_keeps_empty_quotes() {
        assert_eq!(parse_args("todo add \"\""), vec!["todo", "add", ""]);
        let args = parse_args("config set backend.base_url ''");
        assert_eq!(args, vec!["config", "set", "backend.base_url", ""]);
        assert!(parse_args("   ").is_empty());
    }

    #[test]
    fn test_completes_commands_from_cli() {
        let helper = ShellHelper::new();

        let (start, matches) = helper.candidates("");
        assert_eq!(start, 0);
        for name in ["plot", "todo", "message", "config", "help", "exit", "quit"] {
            assert!(matches.iter().any(|m| m == name), "missing {name}");
        }
        assert!(!matches.iter().any(|m| m == "shell"));

        assert_eq!(helper.candidates("to"), (0, vec!["todo".to_string()]));
        assert_eq!(
            helper.candidates("todo "),
            (5, vec!["list".to_string(), "add".to_string()])
        );
        assert_eq!(helper.candidates("message e"), (8, vec!["echo".to_string()]));
        assert_eq!(helper.candidates("frob "), (5, Vec::<String>::new()));
    }

    #[test]
    fn test_completes_flags_and_skips_values() {
        let helper = ShellHelper::new();

        assert_eq!(
            helper.candidates("plot generate --am"),
            (14, vec!["--amplitude".to_string()])
        );
        // Global flags are offered after a subcommand too
        assert_eq!(helper.candidates("todo list --js").1, vec!["--json".to_string()]);
        // The word after --base-url is a URL, not a command
        assert!(helper.candidates("--base-url ").1.is_empty());
        assert_eq!(
            helper.candidates("--base-url http://x:1 to").1,
            vec!["todo".to_string()]
        );
        assert_eq!(helper.candidates("--mock todo a").1, vec!["add".to_string()]);
    }

    #[test]
    fn test_hint_is_remainder_of_single_match() {
        let helper = ShellHelper::new();
        assert_eq!(helper.hint_for("mess").as_deref(), Some("age"));
        assert_eq!(helper.hint_for("plot gen").as_deref(), Some("erate"));
        assert_eq!(helper.hint_for("todo"), None);
        assert_eq!(helper.hint_for("todo "), None);
        assert_eq!(helper.hint_for("config s"), None);
    }

    #[test]
    fn test_help_lists_every_command() {
        let text = help_text();
        for usage in ["plot generate", "todo list", "todo add", "message echo", "config set"] {
            assert!(text.contains(usage), "missing {usage}");
        }
        assert!(!text.contains("shell"));
    }

    #[tokio::test]
    async fn test_session_reuses_backend() {
        let mock = Arc::new(MockBackend::default());
        let session = mock_session(mock.clone());

        assert!(run_command(parse_args("todo add 'walk dog' -q"), &session).await.unwrap());
        assert!(run_command(parse_args("todo list --json"), &session).await.unwrap());
        assert!(!run_command(parse_args("exit"), &session).await.unwrap());

        assert_eq!(mock.calls().add, 1);
        assert_eq!(mock.calls().list, 2);
    }

    #[tokio::test]
    async fn test_empty_quoted_todo_reaches_validation() {
        let mock = Arc::new(MockBackend::default());
        let session = mock_session(mock.clone());

        let err = run_command(parse_args("todo add \"\""), &session).await.unwrap_err();
        assert_eq!(err.to_string(), crate::state::EMPTY_TODO_ERROR);
        assert_eq!(mock.calls().add, 0);
    }

    #[tokio::test]
    async fn test_bad_command_keeps_shell_running() {
        let session = mock_session(Arc::new(MockBackend::default()));
        assert!(run_command(parse_args("frobnicate"), &session).await.unwrap());
        assert!(run_command(parse_args("shell"), &session).await.unwrap());
    }
}
