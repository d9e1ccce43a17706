//! # Todo Sync Testing
//!
//! Testing utilities for the todo store.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - A scriptable in-memory [`MockTodoApi`]
//! - An in-memory [`InMemoryStorage`] slot
//! - A Given-When-Then harness for the reducer
//! - proptest strategies for todo data
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_testing::{MockTodoApi, SequentialIds, test_clock};
//!
//! #[tokio::test]
//! async fn add_is_confirmed() {
//!     let api = Arc::new(MockTodoApi::new());
//!     let store = TodoStore::remote(api.clone(), Arc::new(test_clock()), Arc::new(SequentialIds::new())).await;
//!
//!     store.add("Buy milk").await.unwrap();
//!     store.settled().await;
//!
//!     assert_eq!(store.list().await[0].id, TodoId::remote("srv-1"));
//! }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Only poisoned locks panic

use chrono::{DateTime, Utc};
use todo_sync_core::environment::{Clock, IdGenerator};
use todo_sync_core::{TodoId, TodoItem};

mod mock_api;

pub use mock_api::{ApiCall, MockTodoApi};
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, TodoId, Utc};
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use todo_sync_core::{SnapshotStorage, StorageError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_sync_testing::mocks::FixedClock;
    /// use todo_sync_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::test_time())
    }

    /// Temporary ids `tmp-1`, `tmp-2`, ... in call order
    #[derive(Debug, Default)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Starts at `tmp-1`
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> TodoId {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            TodoId::Remote(format!("tmp-{n}"))
        }
    }

    /// Key-value slot kept in memory
    ///
    /// Clones share the same slots, so a test can keep one handle while the
    /// store owns another.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryStorage {
        slots: Arc<Mutex<HashMap<String, String>>>,
        failing: Arc<AtomicBool>,
        saves: Arc<AtomicUsize>,
    }

    impl InMemoryStorage {
        /// Create an empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a storage holding `value` under `key`
        #[must_use]
        pub fn with_raw(key: &str, value: &str) -> Self {
            let storage = Self::new();
            storage.set_raw(key, value);
            storage
        }

        /// Raw value under `key`
        #[must_use]
        pub fn raw(&self, key: &str) -> Option<String> {
            self.slots.lock().unwrap().get(key).cloned()
        }

        /// Overwrite `key` directly, bypassing the store
        pub fn set_raw(&self, key: &str, value: &str) {
            self.slots
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        /// Make every following save fail with an I/O error
        pub fn fail_saves(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Number of successful saves
        #[must_use]
        pub fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    impl SnapshotStorage for InMemoryStorage {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.raw(key))
        }

        fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::other("storage quota exceeded").into());
            }
            self.set_raw(key, value);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use super::{TodoId, TodoItem, test_time};
    use chrono::Duration;
    use std::sync::Arc;
    use todo_sync_core::environment::{LocalIds, TodoEnvironment};
    use todo_sync_core::TodoApi;

    /// A todo created `minutes` after the test epoch
    #[must_use]
    pub fn todo(id: impl Into<TodoId>, text: &str, minutes: i64) -> TodoItem {
        TodoItem::new(
            id.into(),
            text.to_string(),
            test_time() + Duration::minutes(minutes),
        )
    }

    /// Local-mode environment with the fixed clock and ids starting at 1
    #[must_use]
    pub fn local_environment() -> TodoEnvironment {
        TodoEnvironment::local(
            Arc::new(super::test_clock()),
            Arc::new(LocalIds::default()),
        )
    }

    /// Remote-mode environment with the fixed clock and `tmp-N` ids
    #[must_use]
    pub fn remote_environment(api: Arc<dyn TodoApi>) -> TodoEnvironment {
        TodoEnvironment::remote(
            Arc::new(super::test_clock()),
            Arc::new(super::SequentialIds::new()),
            api,
        )
    }

    /// Installs a test-friendly tracing subscriber; repeated calls are ignored
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
pub mod properties {
    use proptest::prelude::*;
    use todo_sync_core::{SortOrder, TodoPatch};

    /// Non-blank todo text
    pub fn todo_text() -> impl Strategy<Value = String> {
        "[a-z][a-z ]{0,15}"
    }

    /// Any sort order
    pub fn sort_order() -> impl Strategy<Value = SortOrder> {
        prop_oneof![
            Just(SortOrder::CompletedFirst),
            Just(SortOrder::IncompleteFirst),
            Just(SortOrder::NewestFirst),
            Just(SortOrder::OldestFirst),
        ]
    }

    /// A non-empty patch
    pub fn patch() -> impl Strategy<Value = TodoPatch> {
        prop_oneof![
            todo_text().prop_map(TodoPatch::text),
            any::<bool>().prop_map(TodoPatch::completed),
            (todo_text(), any::<bool>()).prop_map(|(text, completed)| TodoPatch {
                text: Some(text),
                completed: Some(completed),
            }),
        ]
    }
}

/// The instant every test clock reports
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
}

// Re-export commonly used items
pub use helpers::todo;
pub use mocks::{FixedClock, InMemoryStorage, SequentialIds, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use todo_sync_core::SnapshotStorage;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_id(), TodoId::remote("tmp-1"));
        assert_eq!(ids.next_id(), TodoId::remote("tmp-2"));
    }

    #[test]
    fn in_memory_storage_shares_slots_between_clones() {
        let storage = InMemoryStorage::new();
        let other = storage.clone();

        storage.save("todos", "[]").unwrap();
        assert_eq!(other.load("todos").unwrap().as_deref(), Some("[]"));
        assert_eq!(other.saves(), 1);

        other.fail_saves(true);
        assert!(storage.save("todos", "[1]").is_err());
        assert_eq!(storage.raw("todos").as_deref(), Some("[]"));
    }
}
