use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, Session, User};
use crate::auth::store::{StoreResult, UserStore};

/// PostgreSQL-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                name = COALESCE($2, name),
                updated_at = NOW()
            WHERE id = $3
            RETURNING id, email, name, password_hash, created_at, updated_at
            "#,
        )
        .bind(changes.email.as_deref())
        .bind(changes.name.as_deref())
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO user_sessions (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token, expires_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(session)
    }

    async fn resolve_session(&self, token: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.created_at, u.updated_at
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_password_reset(&self, token: &str, new_hash: &str) -> StoreResult<User> {
        // Dropping `tx` without commit rolls everything back.
        let mut tx = self.db.begin().await?;

        // Row lock: a concurrent consumer blocks here and then finds the row gone.
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM password_resets
            WHERE token = $1 AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, email, name, password_hash, created_at, updated_at
            "#,
        )
        .bind(new_hash)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM password_resets WHERE token = $1")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(user_id = %user.id, "password reset consumed");
        Ok(user)
    }
}
