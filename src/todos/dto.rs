use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub done: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

impl CreateTodoRequest {
    /// Trims the title in place; it must not end up empty.
    pub fn validate(&mut self) -> AppResult<()> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::validation("title is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub done: Option<bool>,
}

impl UpdateTodoRequest {
    pub fn validate(&mut self) -> AppResult<()> {
        if self.title.is_none() && self.done.is_none() {
            return Err(AppError::validation("provide title or done"));
        }
        if let Some(title) = self.title.as_mut() {
            *title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("title cannot be empty"));
            }
        }
        Ok(())
    }
}

/// Path ids are positive integers.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::validation("invalid id")),
    }
}
