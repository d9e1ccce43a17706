//! Apply locally, confirm remotely, roll back on failure.
//!
//! Every remote-backed command follows the same shape: the reducer applies
//! the change to state right away, captures how to undo it, and hands the
//! remote call to [`remote_write`]. The resulting effect feeds back either the
//! confirmation action or a [`TodoAction::WriteFailed`] carrying the rollback.

use crate::action::{Rollback, TodoAction};
use crate::api::ApiError;
use crate::effect::Effect;
use crate::types::TodoId;
use std::future::Future;

/// An optimistic change that has been applied but not yet confirmed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    /// Item the change touched
    pub id: TodoId,
    /// Revision stamped on the item by the change
    pub revision: u64,
    /// How to undo the change
    pub rollback: Rollback,
}

/// Builds the effect that performs `write` and reconciles its outcome
///
/// `confirm` turns the successful result into the action fed back to the
/// reducer. On error no retry is attempted.
pub fn remote_write<T, Fut, C>(pending: PendingWrite, write: Fut, confirm: C) -> Effect<TodoAction>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    C: FnOnce(TodoId, u64, T) -> TodoAction + Send + 'static,
{
    Effect::future(async move {
        let PendingWrite {
            id,
            revision,
            rollback,
        } = pending;

        Some(match write.await {
            Ok(value) => confirm(id, revision, value),
            Err(error) => TodoAction::WriteFailed {
                id,
                revision,
                rollback,
                error: error.to_string(),
            },
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn pending() -> PendingWrite {
        PendingWrite {
            id: TodoId::Local(1),
            revision: 3,
            rollback: Rollback::Discard,
        }
    }

    async fn run(effect: Effect<TodoAction>) -> Option<TodoAction> {
        match effect {
            Effect::Future(fut) => fut.await,
        }
    }

    #[tokio::test]
    async fn success_produces_confirmation() {
        let effect = remote_write(pending(), async { Ok::<_, ApiError>(()) }, |id, revision, ()| {
            TodoAction::WriteConfirmed {
                id,
                revision,
                item: None,
            }
        });

        assert_eq!(
            run(effect).await.unwrap(),
            TodoAction::WriteConfirmed {
                id: TodoId::Local(1),
                revision: 3,
                item: None,
            }
        );
    }

    #[tokio::test]
    async fn failure_carries_rollback() {
        let effect = remote_write(
            pending(),
            async { Err::<(), _>(ApiError::RequestFailed("offline".into())) },
            |_, _, ()| panic!("must not confirm"),
        );

        match run(effect).await.unwrap() {
            TodoAction::WriteFailed {
                revision,
                rollback,
                error,
                ..
            } => {
                assert_eq!(revision, 3);
                assert_eq!(rollback, Rollback::Discard);
                assert!(error.contains("offline"));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }
}
