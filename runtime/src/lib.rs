//! # Todo Sync Runtime
//!
//! Runtime for the todo store: owns the state, runs the reducer, executes
//! remote writes and broadcasts snapshots to observers.
//!
//! ## Core Components
//!
//! - **TodoStore**: the runtime that manages state and executes effects
//! - **Subscription**: one observer of list snapshots
//! - **FileStorage**: the durable slot used in local mode
//! - **TodoConfig**: environment-driven configuration
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_runtime::{FileStorage, TodoStore};
//! use todo_sync_core::SystemClock;
//!
//! let store = TodoStore::local(Arc::new(FileStorage::new(".todo-sync")), Arc::new(SystemClock));
//! let mut changes = store.changes().await;
//!
//! store.add("Write report").await?;
//! let snapshot = changes.recv().await;
//! ```

/// Environment-driven configuration
pub mod config;

/// Metric names and descriptions
pub mod metrics;

mod handle;
mod storage;
mod store;
mod subscription;

/// Error types for the store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during store operations
    ///
    /// Remote and storage failures never surface here; they are reconciled
    /// inside the store and logged.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new mutations
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for remote writes to reconcile
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use config::{ConfigError, PersistenceMode, TodoConfig};
pub use error::StoreError;
pub use handle::EffectHandle;
pub use storage::FileStorage;
pub use store::{DEFAULT_BROADCAST_CAPACITY, TodoStore};
pub use subscription::Subscription;
