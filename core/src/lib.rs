//! # Todo Sync Core
//!
//! Core types and business logic for the todo-list state store.
//!
//! The store follows a reducer architecture:
//!
//! - **State**: [`TodoState`], the authoritative ordered list of items
//! - **Action**: [`TodoAction`], commands from callers and events fed back by effects
//! - **Reducer**: [`TodoReducer`], a pure function `(State, Action, Environment) → Effects`
//! - **Effect**: [`Effect`], descriptions of remote calls executed by the runtime
//! - **Environment**: [`TodoEnvironment`], clock, id source and optional remote API
//!
//! Remote-backed commands are optimistic: the reducer changes state first and
//! returns an effect built by [`optimistic::remote_write`], which reports
//! either a confirmation or a rollback.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use todo_sync_core::{
//!     LocalIds, Reducer, SystemClock, TodoAction, TodoEnvironment, TodoItem, TodoReducer,
//!     TodoState, environment::{Clock, IdGenerator},
//! };
//!
//! let env = TodoEnvironment::local(Arc::new(SystemClock), Arc::new(LocalIds::default()));
//! let mut state = TodoState::new();
//!
//! let item = TodoItem::new(env.ids.next_id(), "Buy milk".to_string(), env.clock.now());
//! let effects = TodoReducer::new().reduce(&mut state, TodoAction::Add { item }, &env);
//!
//! assert!(effects.is_empty());
//! assert_eq!(state.count(), 1);
//! ```

pub mod action;
pub mod api;
pub mod effect;
pub mod environment;
pub mod optimistic;
pub mod reducer;
pub mod snapshot;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use action::{Rollback, TodoAction};
pub use api::{ApiError, ApiFuture, TodoApi};
pub use effect::Effect;
pub use environment::{Clock, IdGenerator, LocalIds, SystemClock, TemporaryIds, TodoEnvironment};
pub use reducer::{Reducer, TodoReducer};
pub use smallvec::{SmallVec, smallvec};
pub use snapshot::{STORAGE_KEY, SnapshotStorage, StorageError};
pub use state::TodoState;
pub use types::{NewTodo, Snapshot, SortOrder, TodoId, TodoItem, TodoPatch, UnknownSortOrder};
