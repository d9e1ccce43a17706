//! Side effect descriptions
//!
//! Effects are values returned by the reducer and executed by the store
//! runtime. They never run inside the reducer itself.

use std::future::Future;
use std::pin::Pin;

/// Effect type - describes a side effect to be executed
///
/// # Type Parameters
///
/// - `Action`: The action type that effects can produce (feedback loop)
pub enum Effect<Action> {
    /// Arbitrary async computation
    ///
    /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
}

impl<Action> Effect<Action> {
    /// Wraps a future as an effect
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        Self::Future(Box::pin(future))
    }
}

// Manual Debug implementation since Future doesn't implement Debug
impl<Action> std::fmt::Debug for Effect<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Future(_) => write!(f, "Effect::Future(<future>)"),
        }
    }
}
