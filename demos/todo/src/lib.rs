//! Line-oriented todo client.
//!
//! Stands in for a UI layer: it renders every snapshot the store publishes and
//! turns typed commands into store mutations.

use std::fmt::Write;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use todo_sync_core::{SystemClock, TemporaryIds, TodoId, TodoItem, TodoPatch};
use todo_sync_http::RemoteTodoApi;
use todo_sync_runtime::{FileStorage, PersistenceMode, StoreError, TodoConfig, TodoStore};

/// Usage text printed by `help`
pub const HELP: &str = "\
commands:
  add <text>         add a todo
  edit <id> <text>   change a todo's text
  toggle <id>        flip completed
  rm <id>            delete a todo
  sort <criterion>   completed | incomplete | newest | oldest
  list               print the list
  reload             fetch the list again (remote mode)
  quit               exit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <text>`
    Add(String),
    /// `edit <id> <text>`
    Edit(String, String),
    /// `toggle <id>`
    Toggle(String),
    /// `rm <id>`
    Remove(String),
    /// `sort <criterion>`
    Sort(String),
    /// `list`
    List,
    /// `reload`
    Reload,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

/// Errors while parsing an input line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// First word is not a command
    #[error("unknown command {0:?} (try \"help\")")]
    Unknown(String),
    /// Command given without its argument
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        match word {
            "add" => required("add").map(Self::Add),
            "edit" => {
                let (id, text) = rest
                    .split_once(' ')
                    .ok_or(ParseError::MissingArgument("edit"))?;
                Ok(Self::Edit(id.to_string(), text.trim().to_string()))
            }
            "toggle" => required("toggle").map(Self::Toggle),
            "rm" | "remove" => required("rm").map(Self::Remove),
            "sort" => required("sort").map(Self::Sort),
            "list" | "ls" => Ok(Self::List),
            "reload" => Ok(Self::Reload),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

/// Renders a snapshot as one line per item
#[must_use]
pub fn render(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "(no todos)".to_string();
    }

    let done = items.iter().filter(|item| item.completed).count();
    let mut out = String::new();
    for item in items {
        let mark = if item.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "[{mark}] {:<8} {}", item.id.to_string(), item.text);
    }
    let _ = write!(out, "{done}/{} completed", items.len());
    out
}

/// Finds the id of the item whose printed id is `token`
#[must_use]
pub fn resolve_id(items: &[TodoItem], token: &str) -> Option<TodoId> {
    items
        .iter()
        .find(|item| item.id.to_string() == token)
        .map(|item| item.id.clone())
}

/// Applies `command` to the store
///
/// Unknown ids are reported and skipped; `Quit` is handled by the caller.
///
/// # Errors
///
/// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
pub async fn execute(store: &TodoStore, command: Command) -> Result<(), StoreError> {
    let lookup = |token: &str, items: &[TodoItem]| {
        let id = resolve_id(items, token);
        if id.is_none() {
            println!("no todo with id {token}");
        }
        id
    };

    match command {
        Command::Add(text) => {
            store.add(&text).await?;
        }
        Command::Edit(token, text) => {
            if let Some(id) = lookup(&token, store.list().await.as_slice()) {
                store.update(id, TodoPatch::text(text)).await?;
            }
        }
        Command::Toggle(token) => {
            if let Some(id) = lookup(&token, store.list().await.as_slice()) {
                store.toggle_completed(id).await?;
            }
        }
        Command::Remove(token) => {
            if let Some(id) = lookup(&token, store.list().await.as_slice()) {
                store.remove(id).await?;
            }
        }
        Command::Sort(criterion) => {
            store.sort(&criterion).await?;
        }
        Command::List => println!("{}", render(&store.list().await)),
        Command::Reload => {
            store.reload().await?;
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Builds the store selected by `config`
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub async fn build_store(config: &TodoConfig) -> anyhow::Result<TodoStore> {
    let clock = Arc::new(SystemClock);

    match config.mode {
        PersistenceMode::Local => {
            tracing::info!(dir = %config.storage_dir.display(), "Using local storage");
            let storage = Arc::new(FileStorage::new(&config.storage_dir));
            Ok(TodoStore::local(storage, clock).with_broadcast_capacity(config.broadcast_capacity))
        }
        PersistenceMode::Remote => {
            tracing::info!(url = %config.api_url, "Using remote API");
            let api = match config.request_timeout() {
                Some(timeout) => RemoteTodoApi::with_timeout(&config.api_url, timeout)?,
                None => RemoteTodoApi::new(&config.api_url),
            };
            Ok(TodoStore::remote_with_capacity(
                Arc::new(api),
                clock,
                Arc::new(TemporaryIds),
                config.broadcast_capacity,
            )
            .await)
        }
    }
}
