//! Observer side of the store's change stream.

use futures::stream::Stream;
use todo_sync_core::Snapshot;
use tokio::sync::broadcast;

/// One listener on the store's change stream
///
/// Holds the snapshot current at subscription time and receives every later
/// snapshot in the order mutations were applied. Dropping the subscription
/// (or calling [`Subscription::unsubscribe`]) detaches the listener; in-flight
/// remote writes are unaffected.
#[derive(Debug)]
pub struct Subscription {
    current: Snapshot,
    receiver: broadcast::Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) const fn new(current: Snapshot, receiver: broadcast::Receiver<Snapshot>) -> Self {
        Self { current, receiver }
    }

    /// The latest snapshot this subscription has seen
    #[must_use]
    pub const fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Waits for the next snapshot
    ///
    /// Returns `None` once the store has been dropped. A listener that falls
    /// behind skips the snapshots it missed; each snapshot is a full list, so
    /// the next one received is still complete.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => {
                    self.current = Snapshot::clone(&snapshot);
                    return Some(snapshot);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged, skipping stale snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next snapshot if one is already queued
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => {
                    self.current = Snapshot::clone(&snapshot);
                    return Some(snapshot);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged, skipping stale snapshots");
                }
                Err(_) => return None,
            }
        }
    }

    /// Turns the subscription into a stream of snapshots
    pub fn into_stream(mut self) -> impl Stream<Item = Snapshot> + Send + 'static {
        async_stream::stream! {
            while let Some(snapshot) = self.recv().await {
                yield snapshot;
            }
        }
    }

    /// Detaches from the store
    pub fn unsubscribe(self) {
        drop(self);
    }
}
