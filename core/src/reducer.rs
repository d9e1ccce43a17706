//! Reducer logic for the todo list.
//!
//! Commands are applied to state immediately (optimistic) and, in remote
//! mode, return an effect that confirms the change against the API. Events
//! fed back by those effects reconcile or roll back the optimistic view.

use crate::action::{Rollback, TodoAction};
use crate::effect::Effect;
use crate::environment::TodoEnvironment;
use crate::optimistic::{PendingWrite, remote_write};
use crate::state::TodoState;
use crate::types::{NewTodo, SortOrder, TodoId, TodoItem, TodoPatch};
use smallvec::{SmallVec, smallvec};

/// The Reducer trait - core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    ///
    /// Updates state in place and returns effect descriptions for the
    /// runtime to execute. Never performs I/O itself.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}

type Effects = SmallVec<[Effect<TodoAction>; 4]>;

/// Reducer for the todo list
#[derive(Clone, Copy, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn load(env: &TodoEnvironment) -> Effects {
        let Some(api) = env.api.clone() else {
            tracing::debug!("Load ignored in local mode");
            return SmallVec::new();
        };

        smallvec![Effect::future(async move {
            Some(match api.list().await {
                Ok(items) => TodoAction::Loaded { items },
                Err(error) => TodoAction::LoadFailed {
                    error: error.to_string(),
                },
            })
        })]
    }

    fn add(state: &mut TodoState, item: TodoItem, env: &TodoEnvironment) -> Effects {
        let text = item.text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring todo with empty text");
            return SmallVec::new();
        }
        if state.contains(&item.id) {
            tracing::warn!(id = %item.id, "Todo with this id already exists");
            return SmallVec::new();
        }

        let item = TodoItem {
            text: text.to_string(),
            ..item
        };
        state.items.push(item.clone());
        state.touch();

        let Some(api) = env.api.clone() else {
            return SmallVec::new();
        };
        let revision = state.stamp(&item.id);
        state.mark_provisional(&item.id);

        let body = NewTodo::from(&item);
        let pending = PendingWrite {
            id: item.id,
            revision,
            rollback: Rollback::Discard,
        };
        smallvec![remote_write(
            pending,
            async move { api.create(body).await },
            |temp_id, revision, created| TodoAction::AddConfirmed {
                temp_id,
                item: created,
                revision: Some(revision),
            },
        )]
    }

    fn update(
        state: &mut TodoState,
        id: TodoId,
        mut patch: TodoPatch,
        env: &TodoEnvironment,
    ) -> Effects {
        let Some(index) = state.position(&id) else {
            tracing::warn!(%id, "Todo not found for update");
            return SmallVec::new();
        };
        if let Some(text) = patch.text.as_deref() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                tracing::debug!(%id, "Ignoring update with empty text");
                return SmallVec::new();
            }
            patch.text = Some(trimmed.to_string());
        }
        if patch.is_empty() {
            tracing::debug!(%id, "Ignoring empty update");
            return SmallVec::new();
        }

        let prior = state.items[index].clone();
        state.items[index].apply(&patch);
        state.touch();

        // Revisions only matter while a remote write can come back.
        let Some(api) = env.api.clone() else {
            return SmallVec::new();
        };
        let revision = state.stamp(&id);
        if state.is_provisional(&id) {
            // The server does not know this id yet; the confirmation pushes the edit.
            tracing::debug!(%id, "Deferring update until create is confirmed");
            return SmallVec::new();
        }

        let pending = PendingWrite {
            id: id.clone(),
            revision,
            rollback: Rollback::Restore { index, item: prior },
        };
        smallvec![remote_write(
            pending,
            async move { api.update(id, patch).await },
            |id, revision, item| TodoAction::WriteConfirmed { id, revision, item },
        )]
    }

    fn toggle(state: &mut TodoState, id: TodoId, env: &TodoEnvironment) -> Effects {
        let Some(item) = state.get(&id) else {
            tracing::warn!(%id, "Todo not found for toggle");
            return SmallVec::new();
        };
        let patch = TodoPatch::completed(!item.completed);
        Self::update(state, id, patch, env)
    }

    fn remove(state: &mut TodoState, id: TodoId, env: &TodoEnvironment) -> Effects {
        let Some(index) = state.position(&id) else {
            tracing::warn!(%id, "Todo not found for delete");
            return SmallVec::new();
        };

        let removed = state.items.remove(index);
        state.touch();

        let Some(api) = env.api.clone() else {
            return SmallVec::new();
        };
        let revision = state.stamp(&id);
        if state.is_provisional(&id) {
            tracing::debug!(%id, "Provisional todo deleted, server copy removed on confirmation");
            state.orphan(&id);
            return SmallVec::new();
        }

        let pending = PendingWrite {
            id: id.clone(),
            revision,
            rollback: Rollback::Restore {
                index,
                item: removed,
            },
        };
        smallvec![remote_write(
            pending,
            async move { api.delete(id).await },
            |id, revision, ()| TodoAction::WriteConfirmed {
                id,
                revision,
                item: None,
            },
        )]
    }

    fn sort(state: &mut TodoState, order: SortOrder) {
        order.sort(&mut state.items);
        state.touch();
    }

    fn add_confirmed(
        state: &mut TodoState,
        temp_id: &TodoId,
        mut server: TodoItem,
        revision: Option<u64>,
        env: &TodoEnvironment,
    ) -> Effects {
        if state.settle_provisional(temp_id) {
            state.forget_revision(temp_id);
            let Some(api) = env.api.clone() else {
                return SmallVec::new();
            };
            tracing::info!(%temp_id, id = %server.id, "Deleting server copy of a removed provisional todo");
            let id = server.id;
            return smallvec![Effect::future(async move {
                if let Err(error) = api.delete(id.clone()).await {
                    tracing::error!(%id, %error, "Failed to delete server copy of removed todo");
                }
                None
            })];
        }

        let Some(index) = state.position(temp_id) else {
            tracing::warn!(%temp_id, "Provisional todo not found for confirmation");
            return SmallVec::new();
        };
        if &server.id != temp_id && state.contains(&server.id) {
            // Already present, e.g. fetched by a reload while the create was in flight.
            state.items.remove(index);
            state.forget_revision(temp_id);
            state.touch();
            return SmallVec::new();
        }

        let untouched = revision.is_none_or(|r| state.is_current(temp_id, r));
        state.forget_revision(temp_id);

        if untouched {
            if server.text.trim().is_empty() {
                tracing::warn!(id = %server.id, "Server copy has empty text, keeping local copy");
                state.items[index].id = server.id;
            } else {
                state.items[index] = server;
            }
            state.touch();
            return SmallVec::new();
        }

        // Edits made while the create was in flight win over the server copy.
        let local = &mut state.items[index];
        let patch = TodoPatch {
            text: (local.text != server.text).then(|| local.text.clone()),
            completed: (local.completed != server.completed).then_some(local.completed),
        };
        local.id = server.id.clone();
        local.created_at = server.created_at;
        if server.text.trim().is_empty() {
            // Never roll back to a blank text.
            server.text = local.text.clone();
        }
        state.touch();

        let Some(api) = env.api.clone() else {
            return SmallVec::new();
        };
        if patch.is_empty() {
            return SmallVec::new();
        }
        let revision = state.stamp(&server.id);

        let id = server.id.clone();
        let pending = PendingWrite {
            id: id.clone(),
            revision,
            rollback: Rollback::Restore {
                index,
                item: server,
            },
        };
        smallvec![remote_write(
            pending,
            async move { api.update(id, patch).await },
            |id, revision, item| TodoAction::WriteConfirmed { id, revision, item },
        )]
    }

    fn write_confirmed(state: &mut TodoState, id: &TodoId, revision: u64, item: Option<TodoItem>) {
        if !state.is_current(id, revision) {
            tracing::debug!(%id, revision, "Skipping stale confirmation");
            return;
        }

        let Some(index) = state.position(id) else {
            state.forget_revision(id);
            return;
        };
        if let Some(server) = item {
            if server.text.trim().is_empty() {
                tracing::warn!(%id, "Server copy has empty text, keeping local copy");
                return;
            }
            if &server.id == id && state.items[index] != server {
                state.items[index] = server;
                state.touch();
            }
        }
    }

    fn write_failed(
        state: &mut TodoState,
        id: &TodoId,
        revision: u64,
        rollback: Rollback,
        error: &str,
    ) {
        tracing::error!(%id, %error, "Remote write failed, rolling back");

        match rollback {
            Rollback::Discard => {
                // A failed create never existed remotely, so it is dropped regardless of edits.
                state.settle_provisional(id);
                state.forget_revision(id);
                if let Some(index) = state.position(id) {
                    state.items.remove(index);
                    state.touch();
                }
            }
            Rollback::Restore { index, item } => {
                if !state.is_current(id, revision) {
                    tracing::debug!(%id, revision, "Skipping stale rollback");
                    return;
                }
                match state.position(id) {
                    Some(position) => state.items[position] = item,
                    None => {
                        let at = index.min(state.items.len());
                        state.items.insert(at, item);
                    }
                }
                state.touch();
            }
        }
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            // ========== Commands ==========
            TodoAction::Load => Self::load(env),
            TodoAction::Add { item } => Self::add(state, item, env),
            TodoAction::Update { id, patch } => Self::update(state, id, patch, env),
            TodoAction::ToggleCompleted { id } => Self::toggle(state, id, env),
            TodoAction::Remove { id } => Self::remove(state, id, env),
            TodoAction::Sort { order } => {
                Self::sort(state, order);
                SmallVec::new()
            }

            // ========== Events ==========
            TodoAction::Loaded { items } => {
                tracing::info!(count = items.len(), "Todos loaded");
                state.replace_all(items);
                SmallVec::new()
            }
            TodoAction::LoadFailed { error } => {
                tracing::error!(%error, "Failed to load todos");
                SmallVec::new()
            }
            TodoAction::AddConfirmed {
                temp_id,
                item,
                revision,
            } => Self::add_confirmed(state, &temp_id, item, revision, env),
            TodoAction::WriteConfirmed { id, revision, item } => {
                Self::write_confirmed(state, &id, revision, item);
                SmallVec::new()
            }
            TodoAction::WriteFailed {
                id,
                revision,
                rollback,
                error,
            } => {
                Self::write_failed(state, &id, revision, rollback, &error);
                SmallVec::new()
            }
        }
    }
}
