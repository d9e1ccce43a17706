//! In-memory state of the todo list.

use crate::types::{Snapshot, TodoId, TodoItem};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Authoritative list of todo items plus bookkeeping for optimistic writes
///
/// `version` increases on every change observers must see. Revisions are
/// per-item stamps: each optimistic mutation gives the touched item a fresh
/// revision, and confirmations or rollbacks issued under an older revision are
/// recognised as stale.
#[derive(Clone, Debug, Default)]
pub struct TodoState {
    pub(crate) items: Vec<TodoItem>,
    revisions: HashMap<TodoId, u64>,
    last_revision: u64,
    version: u64,
    pending_adds: HashSet<TodoId>,
    orphaned: HashSet<TodoId>,
}

impl TodoState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `items`
    ///
    /// Items with duplicate ids or blank text are dropped.
    #[must_use]
    pub fn with_items(items: Vec<TodoItem>) -> Self {
        Self {
            items: sanitize(items),
            ..Self::default()
        }
    }

    /// Items in display order
    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Copies the current list into a shareable snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Arc::new(self.items.clone())
    }

    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns the number of completed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|t| t.completed).count()
    }

    /// Returns a todo by ID
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|t| &t.id == id)
    }

    /// Returns the position of a todo in the list
    #[must_use]
    pub fn position(&self, id: &TodoId) -> Option<usize> {
        self.items.iter().position(|t| &t.id == id)
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn contains(&self, id: &TodoId) -> bool {
        self.position(id).is_some()
    }

    /// Largest counter id in the list, used to seed local id generation
    #[must_use]
    pub fn max_local_id(&self) -> u64 {
        self.items
            .iter()
            .filter_map(|t| t.id.as_local())
            .max()
            .unwrap_or(0)
    }

    /// Change counter; bumps whenever observers must be notified
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Revision last stamped on `id`, if any optimistic write touched it
    #[must_use]
    pub fn revision_of(&self, id: &TodoId) -> Option<u64> {
        self.revisions.get(id).copied()
    }

    /// Returns true while `id` names an item whose create is still in flight
    #[must_use]
    pub fn is_provisional(&self, id: &TodoId) -> bool {
        self.pending_adds.contains(id)
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    pub(crate) fn stamp(&mut self, id: &TodoId) -> u64 {
        self.last_revision += 1;
        self.revisions.insert(id.clone(), self.last_revision);
        self.last_revision
    }

    /// Returns true while `revision` is the latest stamp on `id`
    #[must_use]
    pub fn is_current(&self, id: &TodoId, revision: u64) -> bool {
        self.revision_of(id) == Some(revision)
    }

    pub(crate) fn forget_revision(&mut self, id: &TodoId) {
        self.revisions.remove(id);
    }

    pub(crate) fn mark_provisional(&mut self, id: &TodoId) {
        self.pending_adds.insert(id.clone());
    }

    /// Drops provisional bookkeeping for `id`; true if it had been orphaned
    pub(crate) fn settle_provisional(&mut self, id: &TodoId) -> bool {
        self.pending_adds.remove(id);
        self.orphaned.remove(id)
    }

    /// Records that a provisional item was deleted before its create returned
    pub(crate) fn orphan(&mut self, id: &TodoId) {
        self.orphaned.insert(id.clone());
    }

    /// Replaces the list with a fetched one
    ///
    /// Provisional items survive at the end of the list so their pending
    /// confirmations still find them; every other revision is dropped.
    pub(crate) fn replace_all(&mut self, items: Vec<TodoItem>) {
        let mut items = sanitize(items);
        let provisional: Vec<TodoItem> = self
            .items
            .iter()
            .filter(|t| self.pending_adds.contains(&t.id))
            .filter(|t| !items.iter().any(|i| i.id == t.id))
            .cloned()
            .collect();
        items.extend(provisional);

        self.items = items;
        self.revisions.retain(|id, _| self.pending_adds.contains(id));
        self.touch();
    }
}

fn sanitize(items: Vec<TodoItem>) -> Vec<TodoItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            if item.text.trim().is_empty() {
                tracing::warn!(id = %item.id, "Dropping todo with empty text");
                return false;
            }
            if !seen.insert(item.id.clone()) {
                tracing::warn!(id = %item.id, "Dropping todo with duplicate id");
                return false;
            }
            true
        })
        .collect()
}
