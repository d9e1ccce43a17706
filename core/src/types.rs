//! Domain types for the todo list.
//!
//! Items are plain serde values so the same shapes travel over the wire to
//! the remote API and into the local storage slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Identifier of a todo item
///
/// Local mode assigns small integers from a counter. Remote mode uses opaque
/// strings: a temporary client-side id until the server confirms the item,
/// then the server-assigned id. The JSON form is the bare number or string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    /// Counter-assigned id (local mode)
    Local(u64),
    /// Opaque string id (remote mode, temporary or server-assigned)
    Remote(String),
}

impl TodoId {
    /// Creates a string id
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    /// Returns the counter value for local ids
    #[must_use]
    pub const fn as_local(&self) -> Option<u64> {
        match self {
            Self::Local(n) => Some(*n),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(n) => write!(f, "{n}"),
            Self::Remote(s) => f.write_str(s),
        }
    }
}

impl From<u64> for TodoId {
    fn from(value: u64) -> Self {
        Self::Local(value)
    }
}

impl From<&str> for TodoId {
    fn from(value: &str) -> Self {
        Self::Remote(value.to_string())
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Unique identifier (`_id` is accepted on input for document-store backends)
    #[serde(alias = "_id")]
    pub id: TodoId,
    /// Display text, never empty after trimming
    pub text: String,
    /// Whether the todo is completed
    pub completed: bool,
    /// When the todo was created; only used for ordering
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    /// Creates a new, not yet completed todo item
    #[must_use]
    pub const fn new(id: TodoId, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
        }
    }

    /// Merges the fields present in `patch` into this item
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(text) = &patch.text {
            self.text.clone_from(text);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Partial update of a todo item
///
/// Only present fields are serialized, so the value doubles as the `PUT` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    /// New display text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New completion flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Patch that only replaces the text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }

    /// Patch that only sets the completion flag
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    /// Returns true when the patch carries no fields
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}

/// Body of a create request: the server assigns id and timestamp
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    /// Display text
    pub text: String,
    /// Initial completion flag
    pub completed: bool,
}

impl From<&TodoItem> for NewTodo {
    fn from(item: &TodoItem) -> Self {
        Self {
            text: item.text.clone(),
            completed: item.completed,
        }
    }
}

/// Ordering criteria for `Sort`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Completed items before incomplete ones
    CompletedFirst,
    /// Incomplete items before completed ones
    IncompleteFirst,
    /// Most recently created first
    NewestFirst,
    /// Least recently created first
    OldestFirst,
}

impl SortOrder {
    /// Sorts `items` in place. The sort is stable and never touches item fields.
    pub fn sort(self, items: &mut [TodoItem]) {
        match self {
            Self::CompletedFirst => items.sort_by_key(|item| !item.completed),
            Self::IncompleteFirst => items.sort_by_key(|item| item.completed),
            Self::NewestFirst => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::OldestFirst => items.sort_by_key(|item| item.created_at),
        }
    }
}

/// A sort criterion that does not name any `SortOrder`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order: {0:?}")]
pub struct UnknownSortOrder(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" | "completed-first" => Ok(Self::CompletedFirst),
            "incomplete" | "incomplete-first" => Ok(Self::IncompleteFirst),
            "newest" | "newest-first" => Ok(Self::NewestFirst),
            "oldest" | "oldest-first" => Ok(Self::OldestFirst),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CompletedFirst => "completed",
            Self::IncompleteFirst => "incomplete",
            Self::NewestFirst => "newest",
            Self::OldestFirst => "oldest",
        })
    }
}

/// Full ordered list of items at one point in time, shared with observers
pub type Snapshot = Arc<Vec<TodoItem>>;
