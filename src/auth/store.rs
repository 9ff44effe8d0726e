use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, Session, User};

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Row absent, or present but expired.
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    AlreadyExists,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db)
                if db.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                StoreError::AlreadyExists
            }
            _ => StoreError::Backend(err.into()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users, sessions and password resets.
///
/// Token lookups treat `expires_at <= now` exactly like a missing row.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, email: &str, name: &str, password_hash: &str)
        -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn update_user(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<User>;

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Session>;

    async fn resolve_session(&self, token: &str) -> StoreResult<User>;

    async fn create_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Swap in `new_hash` and burn the token in one all-or-nothing step.
    /// Of several concurrent calls with the same token at most one succeeds.
    async fn consume_password_reset(&self, token: &str, new_hash: &str) -> StoreResult<User>;
}
