use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Aggregate counts over the todo table.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Summary {
    pub total: i64,
    pub done: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

pub async fn summary(db: &PgPool) -> anyhow::Result<Summary> {
    let summary = sqlx::query_as::<_, Summary>(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN done THEN 1 ELSE 0 END), 0)::BIGINT AS done
        FROM todos
        "#,
    )
    .fetch_one(db)
    .await
    .context("todo summary")?;
    Ok(summary)
}

#[instrument(skip(state))]
pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<Summary>> {
    summary(&state.db)
        .await
        .map(Json)
        .map_err(|e| AppError::internal("failed to load stats", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_flat() {
        let json = serde_json::to_value(Summary { total: 3, done: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "total": 3, "done": 1 }));
    }
}
