use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, Session, User};
use crate::auth::store::{StoreError, StoreResult, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    // token -> (user_id, expires_at)
    sessions: HashMap<String, (Uuid, OffsetDateTime)>,
    resets: HashMap<String, (Uuid, OffsetDateTime)>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-process store with the same observable semantics as [`PgUserStore`].
///
/// A single mutex stands in for the database: every operation runs under it,
/// which makes reset consumption trivially atomic.
///
/// [`PgUserStore`]: crate::auth::repo::PgUserStore
#[derive(Default)]
pub struct MemoryUserStore {
    tables: Mutex<Tables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store poisoned")))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let mut t = self.lock()?;
        if t.email_taken(email, None) {
            return Err(StoreError::AlreadyExists);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<User> {
        let t = self.lock()?;
        t.users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<User> {
        let mut t = self.lock()?;
        if let Some(email) = changes.email.as_deref() {
            if t.email_taken(email, Some(id)) {
                return Err(StoreError::AlreadyExists);
            }
        }
        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Session> {
        let mut t = self.lock()?;
        if t.sessions.contains_key(token) {
            return Err(StoreError::AlreadyExists);
        }
        t.sessions.insert(token.to_string(), (user_id, expires_at));
        Ok(Session {
            token: token.to_string(),
            expires_at,
        })
    }

    async fn resolve_session(&self, token: &str) -> StoreResult<User> {
        let t = self.lock()?;
        let now = OffsetDateTime::now_utc();
        t.sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| t.users.get(user_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let mut t = self.lock()?;
        if t.resets.contains_key(token) {
            return Err(StoreError::AlreadyExists);
        }
        t.resets.insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn consume_password_reset(&self, token: &str, new_hash: &str) -> StoreResult<User> {
        let mut t = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let user_id = match t.resets.get(token) {
            Some((user_id, expires_at)) if *expires_at > now => *user_id,
            _ => return Err(StoreError::NotFound),
        };
        // Check the owner before touching anything so a failure leaves the token intact.
        let user = t.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.password_hash = new_hash.to_string();
        user.updated_at = now;
        let user = user.clone();
        t.resets.remove(token);
        Ok(user)
    }
}
