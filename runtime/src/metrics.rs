//! Metric names recorded by the store.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless the
//! application installs a recorder (the demo installs the Prometheus one).

use metrics::{Unit, describe_counter};

/// Commands applied by the store
pub const MUTATIONS_TOTAL: &str = "todo_store.mutations.total";

/// Remote loads and writes that failed
pub const REMOTE_FAILURES: &str = "todo_store.remote.failures";

/// Local slot writes that failed
pub const STORAGE_FAILURES: &str = "todo_store.storage.failures";

/// Failed writes whose rollback was applied
pub const ROLLBACKS_TOTAL: &str = "todo_store.rollbacks.total";

/// Failed writes whose rollback was skipped because the item changed since
pub const STALE_RECONCILIATIONS: &str = "todo_store.stale_reconciliations.total";

/// Snapshots broadcast to subscribers
pub const NOTIFICATIONS_TOTAL: &str = "todo_store.notifications.total";

/// Registers descriptions for all store metrics
pub fn describe_metrics() {
    describe_counter!(MUTATIONS_TOTAL, Unit::Count, "Commands applied by the todo store");
    describe_counter!(
        REMOTE_FAILURES,
        Unit::Count,
        "Remote loads and writes that failed and were rolled back"
    );
    describe_counter!(
        STORAGE_FAILURES,
        Unit::Count,
        "Failed writes to the local storage slot"
    );
    describe_counter!(ROLLBACKS_TOTAL, Unit::Count, "Optimistic changes rolled back");
    describe_counter!(
        STALE_RECONCILIATIONS,
        Unit::Count,
        "Rollbacks skipped because a newer local change superseded them"
    );
    describe_counter!(
        NOTIFICATIONS_TOTAL,
        Unit::Count,
        "Snapshots broadcast to subscribers"
    );
}
