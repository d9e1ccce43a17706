//! Scriptable in-memory stand-in for the remote todo API.

use crate::test_time;
use std::sync::Mutex;
use todo_sync_core::{ApiError, ApiFuture, NewTodo, TodoApi, TodoId, TodoItem, TodoPatch};
use tokio::sync::watch;

/// One request received by [`MockTodoApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `GET /todos`
    List,
    /// `POST /todos`
    Create(NewTodo),
    /// `PUT /todos/{id}`
    Update(TodoId, TodoPatch),
    /// `DELETE /todos/{id}`
    Delete(TodoId),
}

type FailurePredicate = Box<dyn Fn(&ApiCall) -> bool + Send + Sync>;

struct Server {
    todos: Vec<TodoItem>,
    next_id: u64,
    calls: Vec<ApiCall>,
    failures: Vec<FailurePredicate>,
    echo_updates: bool,
}

/// In-memory todo API
///
/// Behaves like the real server: creates get ids `srv-1`, `srv-2`, ...,
/// unknown ids answer `NotFound`. Tests can inject failures per request and
/// hold every request until [`MockTodoApi::release`] to control when
/// confirmations arrive.
///
/// # Example
///
/// ```
/// use todo_sync_testing::{ApiCall, MockTodoApi};
///
/// let api = MockTodoApi::new();
/// api.fail_when(|call| matches!(call, ApiCall::Update(..)));
/// ```
pub struct MockTodoApi {
    server: Mutex<Server>,
    held: watch::Sender<bool>,
}

impl MockTodoApi {
    /// Create an API with no todos
    #[must_use]
    pub fn new() -> Self {
        Self::with_todos(Vec::new())
    }

    /// Create an API already holding `todos`
    #[must_use]
    pub fn with_todos(todos: Vec<TodoItem>) -> Self {
        let (held, _) = watch::channel(false);
        Self {
            server: Mutex::new(Server {
                todos,
                next_id: 0,
                calls: Vec::new(),
                failures: Vec::new(),
                echo_updates: true,
            }),
            held,
        }
    }

    /// Fail every request matching `predicate` with a 503
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&ApiCall) -> bool + Send + Sync + 'static,
    {
        self.server.lock().unwrap().failures.push(Box::new(predicate));
    }

    /// Fail every request
    pub fn fail_all(&self) {
        self.fail_when(|_| true);
    }

    /// Stop injecting failures
    pub fn recover(&self) {
        self.server.lock().unwrap().failures.clear();
    }

    /// Answer updates with an empty body instead of the stored item
    pub fn set_update_echo(&self, echo: bool) {
        self.server.lock().unwrap().echo_updates = echo;
    }

    /// Park every request until [`MockTodoApi::release`]
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    /// Let parked and future requests through
    pub fn release(&self) {
        self.held.send_replace(false);
    }

    /// Requests received so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.server.lock().unwrap().calls.clone()
    }

    /// The server's copy of the list
    #[must_use]
    pub fn todos(&self) -> Vec<TodoItem> {
        self.server.lock().unwrap().todos.clone()
    }

    /// Change the server's copy behind the client's back
    pub fn set_todos(&self, todos: Vec<TodoItem>) {
        self.server.lock().unwrap().todos = todos;
    }

    async fn handle<T>(
        &self,
        call: ApiCall,
        respond: impl FnOnce(&mut Server) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        self.server.lock().unwrap().calls.push(call.clone());

        let mut held = self.held.subscribe();
        while *held.borrow_and_update() {
            if held.changed().await.is_err() {
                break;
            }
        }

        let mut server = self.server.lock().unwrap();
        if server.failures.iter().any(|failing| failing(&call)) {
            return Err(ApiError::Status {
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        respond(&mut server)
    }
}

impl Default for MockTodoApi {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTodoApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTodoApi")
            .field("held", &*self.held.borrow())
            .finish_non_exhaustive()
    }
}

impl TodoApi for MockTodoApi {
    fn list(&self) -> ApiFuture<'_, Vec<TodoItem>> {
        Box::pin(self.handle(ApiCall::List, |server| Ok(server.todos.clone())))
    }

    fn create(&self, todo: NewTodo) -> ApiFuture<'_, TodoItem> {
        Box::pin(self.handle(ApiCall::Create(todo.clone()), move |server| {
            server.next_id += 1;
            let mut item = TodoItem::new(
                TodoId::Remote(format!("srv-{}", server.next_id)),
                todo.text,
                test_time(),
            );
            item.completed = todo.completed;
            server.todos.push(item.clone());
            Ok(item)
        }))
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> ApiFuture<'_, Option<TodoItem>> {
        Box::pin(
            self.handle(ApiCall::Update(id.clone(), patch.clone()), move |server| {
                let item = server
                    .todos
                    .iter_mut()
                    .find(|item| item.id == id)
                    .ok_or(ApiError::NotFound(id))?;
                item.apply(&patch);
                Ok(server.echo_updates.then(|| item.clone()))
            }),
        )
    }

    fn delete(&self, id: TodoId) -> ApiFuture<'_, ()> {
        Box::pin(self.handle(ApiCall::Delete(id.clone()), move |server| {
            let index = server
                .todos
                .iter()
                .position(|item| item.id == id)
                .ok_or(ApiError::NotFound(id))?;
            server.todos.remove(index);
            Ok(())
        }))
    }
}
