mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use dto::{CreateTodoRequest, Todo, TodoList, UpdateTodoRequest};

pub fn router() -> Router<AppState> {
    handlers::todo_routes()
}
