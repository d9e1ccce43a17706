//! Remote source of truth for remote mode.
//!
//! The store only sees this trait; `todo-sync-http` provides the reqwest
//! implementation and `todo-sync-testing` a scriptable mock.

use crate::types::{NewTodo, TodoId, TodoItem, TodoPatch};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by `TodoApi` methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Errors reported by a `TodoApi` implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, DNS, TLS, ...)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be decoded
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The server does not know the item
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    /// The server answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}

/// REST-style todo backend rooted at `/api/v1/todos`
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of `async fn` so the store can hold
/// an `Arc<dyn TodoApi>` and move clones of it into spawned effects.
pub trait TodoApi: Send + Sync {
    /// `GET /api/v1/todos`
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` when the request or decoding fails.
    fn list(&self) -> ApiFuture<'_, Vec<TodoItem>>;

    /// `POST /api/v1/todos`; the server assigns the id
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` when the request or decoding fails.
    fn create(&self, todo: NewTodo) -> ApiFuture<'_, TodoItem>;

    /// `PUT /api/v1/todos/{id}` with partial fields
    ///
    /// Returns the server copy when the response carries one.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` when the request fails or the item is unknown.
    fn update(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<'_, Option<TodoItem>>;

    /// `DELETE /api/v1/todos/{id}`
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` when the request fails or the item is unknown.
    fn delete(&self, id: TodoId) -> ApiFuture<'_, ()>;
}
