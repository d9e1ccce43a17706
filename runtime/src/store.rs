//! The todo store runtime.

use crate::error::StoreError;
use crate::handle::{DecrementGuard, EffectHandle, EffectTracking};
use crate::metrics::{
    MUTATIONS_TOTAL, NOTIFICATIONS_TOTAL, REMOTE_FAILURES, ROLLBACKS_TOTAL, STALE_RECONCILIATIONS,
    STORAGE_FAILURES,
};
use crate::subscription::Subscription;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use todo_sync_core::snapshot::{load_items, save_items};
use todo_sync_core::{
    Clock, Effect, IdGenerator, LocalIds, Reducer, Rollback, Snapshot, SnapshotStorage, SortOrder,
    TodoAction, TodoApi, TodoEnvironment, TodoId, TodoItem, TodoPatch, TodoReducer, TodoState,
};
use tokio::sync::{RwLock, broadcast, watch};

/// Default capacity of the snapshot broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// The todo store - owner of the authoritative list
///
/// The store manages:
/// 1. State (behind `RwLock`; one reducer step runs at a time)
/// 2. Effect execution (remote writes, fed back as actions)
/// 3. Change broadcast (one snapshot per state change, in application order)
/// 4. Local mirroring (local mode writes every snapshot to the storage slot)
///
/// Cloning is cheap and every clone drives the same store.
///
/// # Example
///
/// ```ignore
/// let store = TodoStore::local(Arc::new(FileStorage::new(".todo-sync")), Arc::new(SystemClock));
/// let mut changes = store.changes().await;
///
/// store.add("Buy milk").await?;
/// let snapshot = changes.recv().await;
/// ```
#[derive(Clone)]
pub struct TodoStore {
    state: Arc<RwLock<TodoState>>,
    reducer: TodoReducer,
    environment: TodoEnvironment,
    storage: Option<Arc<dyn SnapshotStorage>>,
    changes: broadcast::Sender<Snapshot>,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

/// Outcome of one action: its effect handle and whether observers were notified
struct Dispatched {
    handle: EffectHandle,
    changed: bool,
}

impl TodoStore {
    /// Create a store with initial state and environment
    ///
    /// Nothing is loaded or mirrored; see [`TodoStore::local`] and
    /// [`TodoStore::remote`] for the two persistence modes.
    #[must_use]
    pub fn new(initial_state: TodoState, environment: TodoEnvironment) -> Self {
        let (changes, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let (idle, _) = watch::channel(());

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: TodoReducer::new(),
            environment,
            storage: None,
            changes,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(idle),
        }
    }

    /// Mirror every change into `storage`
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the snapshot channel with one of `capacity` slots
    ///
    /// Call before subscribing or sending any action; subscriptions and
    /// in-flight effects keep the old channel.
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        self.changes = changes;
        self
    }

    /// Build a local-mode store backed by `storage`
    ///
    /// The slot is read once. A missing slot starts an empty list; an unreadable
    /// or corrupt one is logged and also starts empty. Ids continue after the
    /// largest id found.
    #[must_use]
    pub fn local(storage: Arc<dyn SnapshotStorage>, clock: Arc<dyn Clock>) -> Self {
        let items = load_items(storage.as_ref()).unwrap_or_else(|error| {
            tracing::warn!(%error, "Could not read stored todos, starting empty");
            Vec::new()
        });
        let state = TodoState::with_items(items);
        tracing::info!(count = state.count(), "Loaded todos from local storage");

        let ids = Arc::new(LocalIds::starting_after(state.max_local_id()));
        Self::new(state, TodoEnvironment::local(clock, ids)).with_storage(storage)
    }

    /// Build a remote-mode store and start the initial load
    ///
    /// Returns before the load completes; subscribers get one snapshot when it
    /// does.
    pub async fn remote(
        api: Arc<dyn TodoApi>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self::remote_with_capacity(api, clock, ids, DEFAULT_BROADCAST_CAPACITY).await
    }

    /// Like [`TodoStore::remote`] with a snapshot channel of `capacity` slots
    pub async fn remote_with_capacity(
        api: Arc<dyn TodoApi>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        capacity: usize,
    ) -> Self {
        let store = Self::new(TodoState::new(), TodoEnvironment::remote(clock, ids, api))
            .with_broadcast_capacity(capacity);
        store.apply(TodoAction::Load).await;
        store
    }

    /// Returns true when writes are confirmed against a remote API
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.environment.is_remote()
    }

    /// Current snapshot of the list
    pub async fn list(&self) -> Snapshot {
        self.state.read().await.snapshot()
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let done = store.state(|s| s.completed_count()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&TodoState) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Subscribe to list snapshots
    ///
    /// The subscription starts at the current snapshot and receives every
    /// later one; no change can fall between the two.
    pub async fn changes(&self) -> Subscription {
        let state = self.state.read().await;
        Subscription::new(state.snapshot(), self.changes.subscribe())
    }

    /// Add a todo with `text`
    ///
    /// Returns the new item, or `None` when `text` is blank. In remote mode the
    /// item carries a temporary id until the server confirms it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self), name = "todo_store_add")]
    pub async fn add(&self, text: &str) -> Result<Option<TodoItem>, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring todo with empty text");
            return Ok(None);
        }

        let item = TodoItem::new(
            self.environment.ids.next_id(),
            text.to_string(),
            self.environment.clock.now(),
        );
        let dispatched = self
            .send_internal(TodoAction::Add { item: item.clone() }, true)
            .await?;

        Ok(dispatched.changed.then_some(item))
    }

    /// Swap the provisional item `temp_id` for the server's copy
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, item), name = "todo_store_confirm_add")]
    pub async fn confirm_add(
        &self,
        temp_id: TodoId,
        item: TodoItem,
    ) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::AddConfirmed {
            temp_id,
            item,
            revision: None,
        })
        .await
    }

    /// Merge `patch` into the item `id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self), name = "todo_store_update")]
    pub async fn update(&self, id: TodoId, patch: TodoPatch) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Update { id, patch }).await
    }

    /// Delete the item `id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self), name = "todo_store_remove")]
    pub async fn remove(&self, id: TodoId) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Remove { id }).await
    }

    /// Flip the completion flag of the item `id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self), name = "todo_store_toggle")]
    pub async fn toggle_completed(&self, id: TodoId) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::ToggleCompleted { id }).await
    }

    /// Reorder the list by a named criterion
    ///
    /// Accepts `completed`, `incomplete`, `newest` and `oldest`. Anything else
    /// logs a warning and leaves the list untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn sort(&self, criterion: &str) -> Result<EffectHandle, StoreError> {
        match criterion.parse::<SortOrder>() {
            Ok(order) => self.sort_by(order).await,
            Err(error) => {
                tracing::warn!(%error, "Ignoring sort request");
                Ok(EffectHandle::completed())
            }
        }
    }

    /// Reorder the list
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self), name = "todo_store_sort")]
    pub async fn sort_by(&self, order: SortOrder) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Sort { order }).await
    }

    /// Fetch the list again from the remote API (no-op in local mode)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn reload(&self) -> Result<EffectHandle, StoreError> {
        self.send(TodoAction::Load).await
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer
    /// 3. Mirrors and broadcasts the new snapshot if the list changed
    /// 4. Spawns the returned effects
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send(&self, action: TodoAction) -> Result<EffectHandle, StoreError> {
        self.send_internal(action, true)
            .await
            .map(|dispatched| dispatched.handle)
    }

    /// Wait until every in-flight remote write has been reconciled
    pub async fn settled(&self) {
        let mut idle = self.idle.subscribe();
        while self.pending_effects.load(Ordering::SeqCst) > 0 {
            if idle.changed().await.is_err() {
                break;
            }
        }
    }

    /// Number of remote writes still in flight
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the store
    ///
    /// New mutations are rejected; writes already in flight still reconcile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
    /// pending effects complete.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        if tokio::time::timeout(timeout, self.settled()).await.is_ok() {
            tracing::info!("All effects completed, shutdown successful");
            Ok(())
        } else {
            let pending = self.pending_effects();
            tracing::error!(pending_effects = pending, "Shutdown timed out");
            Err(StoreError::ShutdownTimeout(pending))
        }
    }

    /// Apply an action that cannot be rejected (initial load, effect feedback)
    async fn apply(&self, action: TodoAction) {
        if let Err(error) = self.send_internal(action, false).await {
            tracing::error!(%error, "Failed to apply action");
        }
    }

    async fn send_internal(
        &self,
        action: TodoAction,
        reject_on_shutdown: bool,
    ) -> Result<Dispatched, StoreError> {
        if reject_on_shutdown && self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        if action.is_command() {
            metrics::counter!(MUTATIONS_TOTAL).increment(1);
        }
        let failed_write = matches!(action, TodoAction::WriteFailed { .. });
        if failed_write || matches!(action, TodoAction::LoadFailed { .. }) {
            metrics::counter!(REMOTE_FAILURES).increment(1);
        }

        let (handle, tracking) = EffectHandle::new();

        let (effects, changed, stale) = {
            let mut state = self.state.write().await;
            let before = state.version();
            let stale = is_stale_rollback(&state, &action);
            let effects = self.reducer.reduce(&mut *state, action, &self.environment);
            let changed = state.version() != before;
            if changed {
                self.publish(&state);
            }
            (effects, changed, stale)
        };

        if stale {
            metrics::counter!(STALE_RECONCILIATIONS).increment(1);
        } else if failed_write && changed {
            metrics::counter!(ROLLBACKS_TOTAL).increment(1);
        }

        tracing::trace!("Executing {} effects", effects.len());
        for effect in effects {
            self.execute_effect(effect, tracking.clone());
        }

        Ok(Dispatched { handle, changed })
    }

    /// Mirror and broadcast the new list; called with the write lock held
    fn publish(&self, state: &TodoState) {
        let snapshot = state.snapshot();

        if let Some(storage) = &self.storage {
            if let Err(error) = save_items(storage.as_ref(), &snapshot) {
                tracing::error!(%error, "Failed to mirror todos to local storage");
                metrics::counter!(STORAGE_FAILURES).increment(1);
            }
        }

        // No receivers is fine; the snapshot stays available through `list`.
        let receivers = self.changes.send(snapshot).unwrap_or(0);
        metrics::counter!(NOTIFICATIONS_TOTAL).increment(1);
        tracing::trace!(receivers, version = state.version(), "Broadcast snapshot");
    }

    fn execute_effect(&self, effect: Effect<TodoAction>, tracking: EffectTracking) {
        match effect {
            Effect::Future(fut) => {
                tracking.increment();
                self.pending_effects.fetch_add(1, Ordering::SeqCst);

                let guard = DecrementGuard(tracking);
                let pending = PendingGuard {
                    counter: Arc::clone(&self.pending_effects),
                    idle: Arc::clone(&self.idle),
                };
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    let _pending = pending;

                    if let Some(action) = fut.await {
                        // Feedback bypasses the shutdown gate so in-flight writes still reconcile.
                        store.apply(action).await;
                    }
                });
            }
        }
    }
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("remote", &self.is_remote())
            .field("local_storage", &self.storage.is_some())
            .field("pending_effects", &self.pending_effects())
            .finish_non_exhaustive()
    }
}

/// Decrements the store-wide pending counter on drop and wakes `settled` at zero
struct PendingGuard {
    counter: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.send_replace(());
        }
    }
}

/// A failed write whose restore no longer applies because the item changed since
fn is_stale_rollback(state: &TodoState, action: &TodoAction) -> bool {
    matches!(
        action,
        TodoAction::WriteFailed {
            id,
            revision,
            rollback: Rollback::Restore { .. },
            ..
        } if !state.is_current(id, *revision)
    )
}
