//! Environment module - Dependency injection traits
//!
//! All external dependencies of the reducer are abstracted behind traits and
//! injected through [`TodoEnvironment`].

use crate::api::TodoApi;
use crate::types::TodoId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Assigns ids to newly added items
pub trait IdGenerator: Send + Sync {
    /// Returns an id not handed out before by this generator
    fn next_id(&self) -> TodoId;
}

/// Counter ids for local mode
///
/// Seed it past the largest id found in storage so reloaded lists never
/// collide with new items.
#[derive(Debug, Default)]
pub struct LocalIds {
    last: AtomicU64,
}

impl LocalIds {
    /// Starts the counter after `last`; the first id handed out is `last + 1`
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

impl IdGenerator for LocalIds {
    fn next_id(&self) -> TodoId {
        TodoId::Local(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Client-side temporary ids for remote mode (`tmp-<uuid>`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporaryIds;

impl IdGenerator for TemporaryIds {
    fn next_id(&self) -> TodoId {
        TodoId::Remote(format!("tmp-{}", Uuid::new_v4()))
    }
}

/// Environment dependencies for the todo reducer
///
/// The presence of `api` selects remote mode.
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Clock for creation timestamps
    pub clock: Arc<dyn Clock>,
    /// Id source for new items
    pub ids: Arc<dyn IdGenerator>,
    /// Remote source of truth (remote mode only)
    pub api: Option<Arc<dyn TodoApi>>,
}

impl TodoEnvironment {
    /// Environment for local mode
    #[must_use]
    pub fn local(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            clock,
            ids,
            api: None,
        }
    }

    /// Environment for remote mode
    #[must_use]
    pub fn remote(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, api: Arc<dyn TodoApi>) -> Self {
        Self {
            clock,
            ids,
            api: Some(api),
        }
    }

    /// Returns true when writes are confirmed against a remote API
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.api.is_some()
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment")
            .field("remote", &self.is_remote())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ids_continue_after_seed() {
        let ids = LocalIds::starting_after(4);
        assert_eq!(ids.next_id(), TodoId::Local(5));
        assert_eq!(ids.next_id(), TodoId::Local(6));
    }

    #[test]
    fn temporary_ids_are_unique_strings() {
        let first = TemporaryIds.next_id();
        let second = TemporaryIds.next_id();
        assert_ne!(first, second);
        assert!(first.to_string().starts_with("tmp-"));
    }
}
