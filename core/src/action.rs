//! Actions processed by the `TodoReducer`.

use crate::types::{SortOrder, TodoId, TodoItem, TodoPatch};

/// How to undo an optimistic change when its remote write fails
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rollback {
    /// Drop the provisional item (failed create)
    Discard,
    /// Put the captured item back, at `index` if it is no longer in the list
    Restore {
        /// Position the item had when the change was applied
        index: usize,
        /// The item as it was before the change
        item: TodoItem,
    },
}

/// Commands and the events fed back by effects
///
/// Commands come from callers and are applied optimistically. Events are
/// produced by remote effects and reconcile the optimistic view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoAction {
    // ========== Commands ==========
    /// Command: fetch the full list from the remote source
    Load,

    /// Command: append a new item (id and timestamp already assigned)
    Add {
        /// The item to append
        item: TodoItem,
    },

    /// Command: merge partial fields into an item
    Update {
        /// Target item
        id: TodoId,
        /// Fields to merge
        patch: TodoPatch,
    },

    /// Command: delete an item
    Remove {
        /// Target item
        id: TodoId,
    },

    /// Command: flip the completion flag of an item
    ToggleCompleted {
        /// Target item
        id: TodoId,
    },

    /// Command: reorder the list
    Sort {
        /// Ordering criterion
        order: SortOrder,
    },

    // ========== Events ==========
    /// Event: the remote list was fetched
    Loaded {
        /// Items returned by the server
        items: Vec<TodoItem>,
    },

    /// Event: fetching the remote list failed
    LoadFailed {
        /// Error description
        error: String,
    },

    /// Event: the server accepted a provisional item
    AddConfirmed {
        /// Client-side temporary id of the provisional item
        temp_id: TodoId,
        /// Item as stored by the server
        item: TodoItem,
        /// Revision stamped by the add, `None` for manual confirmation
        revision: Option<u64>,
    },

    /// Event: an update or delete was accepted by the server
    WriteConfirmed {
        /// Target item
        id: TodoId,
        /// Revision the write was issued under
        revision: u64,
        /// Server copy of the item, when the server returned one
        item: Option<TodoItem>,
    },

    /// Event: a remote write failed and the optimistic change must be undone
    WriteFailed {
        /// Target item
        id: TodoId,
        /// Revision the write was issued under
        revision: u64,
        /// How to undo the change
        rollback: Rollback,
        /// Error description
        error: String,
    },
}

impl TodoAction {
    /// Returns true for caller-issued commands
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::Load
                | Self::Add { .. }
                | Self::Update { .. }
                | Self::Remove { .. }
                | Self::ToggleCompleted { .. }
                | Self::Sort { .. }
        )
    }

    /// Returns true for events fed back by effects
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }
}
