use anyhow::Context;
use sqlx::PgPool;

use super::dto::{CreateTodoRequest, Todo, UpdateTodoRequest};

/// All todos, newest first.
pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Todo>> {
    let rows = sqlx::query_as::<_, Todo>(
        r#"
        SELECT id, title, done, created_at, updated_at
        FROM todos
        ORDER BY id DESC
        "#,
    )
    .fetch_all(db)
    .await
    .context("list todos")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<Todo>> {
    let row = sqlx::query_as::<_, Todo>(
        r#"
        SELECT id, title, done, created_at, updated_at
        FROM todos
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get todo")?;
    Ok(row)
}

pub async fn create(db: &PgPool, input: &CreateTodoRequest) -> anyhow::Result<Todo> {
    let row = sqlx::query_as::<_, Todo>(
        r#"
        INSERT INTO todos (title, done)
        VALUES ($1, $2)
        RETURNING id, title, done, created_at, updated_at
        "#,
    )
    .bind(&input.title)
    .bind(input.done)
    .fetch_one(db)
    .await
    .context("insert todo")?;
    Ok(row)
}

/// Partial update; `None` fields keep their value.
pub async fn update(
    db: &PgPool,
    id: i64,
    input: &UpdateTodoRequest,
) -> anyhow::Result<Option<Todo>> {
    let row = sqlx::query_as::<_, Todo>(
        r#"
        UPDATE todos
        SET title = COALESCE($1, title),
            done = COALESCE($2, done),
            updated_at = NOW()
        WHERE id = $3
        RETURNING id, title, done, created_at, updated_at
        "#,
    )
    .bind(input.title.as_deref())
    .bind(input.done)
    .bind(id)
    .fetch_optional(db)
    .await
    .context("update todo")?;
    Ok(row)
}

/// `false` when no row matched.
pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM todos WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete todo")?;
    Ok(res.rows_affected() > 0)
}
