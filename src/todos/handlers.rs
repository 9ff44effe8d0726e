use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    extract::StrictJson,
    state::AppState,
};

use super::dto::{parse_id, CreateTodoRequest, Todo, TodoList, UpdateTodoRequest};
use super::repo;

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("todo not found".into())
}

#[instrument(skip(state))]
pub async fn list_todos(State(state): State<AppState>) -> AppResult<Json<TodoList>> {
    let todos = repo::list(&state.db)
        .await
        .map_err(|e| AppError::internal("failed to load todos", e))?;
    Ok(Json(TodoList { todos }))
}

#[instrument(skip(state))]
pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Todo>> {
    let id = parse_id(&id)?;
    repo::get(&state.db, id)
        .await
        .map_err(|e| AppError::internal("failed to load todo", e))?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    StrictJson(mut payload): StrictJson<CreateTodoRequest>,
) -> AppResult<(StatusCode, Json<Todo>)> {
    payload.validate()?;
    let todo = repo::create(&state.db, &payload)
        .await
        .map_err(|e| AppError::internal("failed to create todo", e))?;
    info!(todo_id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    StrictJson(mut payload): StrictJson<UpdateTodoRequest>,
) -> AppResult<Json<Todo>> {
    let id = parse_id(&id)?;
    payload.validate()?;
    repo::update(&state.db, id, &payload)
        .await
        .map_err(|e| AppError::internal("failed to update todo", e))?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    let deleted = repo::delete(&state.db, id)
        .await
        .map_err(|e| AppError::internal("failed to delete todo", e))?;
    if !deleted {
        return Err(not_found());
    }
    info!(todo_id = id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
