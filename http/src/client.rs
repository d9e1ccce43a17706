//! Todo REST API client implementation

use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use todo_sync_core::{ApiError, ApiFuture, NewTodo, TodoApi, TodoId, TodoItem, TodoPatch};

/// Path of the todo collection below the base URL
pub const TODOS_PATH: &str = "/api/v1/todos";

/// Response wrapper used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP implementation of [`TodoApi`]
#[derive(Debug, Clone)]
pub struct RemoteTodoApi {
    client: Client,
    endpoint: String,
}

impl RemoteTodoApi {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:3000`)
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RequestFailed` if the HTTP client cannot be built
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing `reqwest::Client`
    #[must_use]
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{TODOS_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL of the todo collection
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL of one item; the id is percent-encoded as a single path segment
    fn item_url(&self, id: &TodoId) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.endpoint).map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::RequestFailed(format!("{} is not a base URL", self.endpoint)))?
            .push(&id.to_string());
        Ok(url)
    }

    async fn fetch_all(&self) -> Result<Vec<TodoItem>, ApiError> {
        tracing::debug!(url = %self.endpoint, "GET todos");
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let response = check_status(response, None).await?;
        let envelope = response
            .json::<Envelope<Vec<TodoItem>>>()
            .await
            .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn post(&self, todo: NewTodo) -> Result<TodoItem, ApiError> {
        tracing::debug!(url = %self.endpoint, "POST todo");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&todo)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let response = check_status(response, None).await?;
        let envelope = response
            .json::<Envelope<TodoItem>>()
            .await
            .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))?;
        Ok(envelope.data)
    }

    async fn put(&self, id: TodoId, patch: TodoPatch) -> Result<Option<TodoItem>, ApiError> {
        let url = self.item_url(&id)?;
        tracing::debug!(%url, "PUT todo");
        let response = self
            .client
            .put(url)
            .json(&patch)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let response = check_status(response, Some(id)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        // Some backends acknowledge an update without echoing the item.
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<Envelope<Option<TodoItem>>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| ApiError::ResponseParseFailed(e.to_string()))
    }

    async fn remove(&self, id: TodoId) -> Result<(), ApiError> {
        let url = self.item_url(&id)?;
        tracing::debug!(%url, "DELETE todo");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        check_status(response, Some(id)).await?;
        Ok(())
    }
}

/// Maps non-2xx responses to `ApiError`
///
/// A 404 on an item URL becomes `NotFound`; anything else carries the status
/// and body text.
async fn check_status(response: Response, id: Option<TodoId>) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => Err(ApiError::NotFound(id)),
        (status, _) => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

impl TodoApi for RemoteTodoApi {
    fn list(&self) -> ApiFuture<'_, Vec<TodoItem>> {
        Box::pin(self.fetch_all())
    }

    fn create(&self, todo: NewTodo) -> ApiFuture<'_, TodoItem> {
        Box::pin(self.post(todo))
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<'_, Option<TodoItem>> {
        Box::pin(self.put(id, patch))
    }

    fn delete(&self, id: TodoId) -> ApiFuture<'_, ()> {
        Box::pin(self.remove(id))
    }
}
