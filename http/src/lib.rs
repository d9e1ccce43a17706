//! # Todo Sync HTTP
//!
//! reqwest implementation of [`todo_sync_core::TodoApi`] for a REST backend
//! exposing `/api/v1/todos`.
//!
//! ## Example
//!
//! ```no_run
//! use todo_sync_http::RemoteTodoApi;
//! use todo_sync_core::TodoApi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = RemoteTodoApi::new("http://localhost:3000");
//!     let todos = api.list().await?;
//!     println!("{} todos", todos.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! - `GET /api/v1/todos` returns `{ data: TodoItem[] }`
//! - `POST /api/v1/todos` returns `{ data: TodoItem }`
//! - `PUT /api/v1/todos/{id}` returns `{ data: TodoItem }` or an empty 2xx
//! - `DELETE /api/v1/todos/{id}` returns any 2xx

pub mod client;

pub use client::{RemoteTodoApi, TODOS_PATH};
